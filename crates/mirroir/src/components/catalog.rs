//! Built-in component catalog
//!
//! Always loaded first; on-disk definitions may override any entry by
//! name.

use crate::components::definition::{
    AbsorbCondition, ChevronMode, ClickResult, ClickTarget, ComponentDefinition, Zone,
};

pub fn builtin_definitions() -> Vec<ComponentDefinition> {
    vec![
        table_row_disclosure(),
        summary_card(),
        value_row(),
        nav_bar(),
        tab_bar(),
        alert_dialog(),
    ]
}

/// A standard settings row with a trailing chevron. The most common
/// navigable structure on iOS settings-style screens.
fn table_row_disclosure() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("table-row-disclosure");
    def.description = "Table row with a trailing disclosure chevron".to_string();
    def.chevron_mode = Some(ChevronMode::Required);
    def.min_elements = 1;
    def.max_elements = 4;
    def.max_row_height_pt = 60.0;
    def.exclude_numeric_only = true;
    def.clickable = true;
    def.click_target = ClickTarget::FirstNavigationElement;
    def.click_result = ClickResult::Navigates;
    def.back_after_click = true;
    def
}

/// A headline card that absorbs the explanatory text below it.
fn summary_card() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("summary-card");
    def.description = "Tappable headline card with supporting caption".to_string();
    def.chevron_mode = Some(ChevronMode::Preferred);
    def.max_elements = 4;
    def.max_row_height_pt = 120.0;
    def.has_long_text = Some(true);
    def.clickable = true;
    def.click_target = ClickTarget::FirstNavigationElement;
    def.click_result = ClickResult::Navigates;
    def.back_after_click = true;
    def.absorbs_below_within_pt = 80.0;
    def.absorb_condition = AbsorbCondition::InfoOrDecorationOnly;
    def
}

/// Label + value pair ("Storage" / "128 GB"). Informational, no tap.
fn value_row() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("value-row");
    def.description = "Label with a trailing value, not navigable".to_string();
    def.chevron_mode = Some(ChevronMode::Forbidden);
    def.min_elements = 2;
    def.max_elements = 4;
    def.max_row_height_pt = 60.0;
    def.has_numeric_value = Some(true);
    def
}

fn nav_bar() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("nav-bar");
    def.description = "Top navigation bar with title and back affordance".to_string();
    def.zone = Zone::NavBar;
    def.max_elements = 5;
    def
}

fn tab_bar() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("tab-bar");
    def.description = "Bottom tab bar".to_string();
    def.zone = Zone::TabBar;
    def.min_elements = 2;
    def.max_elements = 6;
    def
}

/// A dialog row carrying dismiss buttons. Tapping dismisses.
fn alert_dialog() -> ComponentDefinition {
    let mut def = ComponentDefinition::named("alert-dialog");
    def.description = "Dialog row with a dismiss button".to_string();
    def.has_dismiss_button = Some(true);
    def.max_elements = 4;
    def.clickable = true;
    def.click_target = ClickTarget::FirstDismissButton;
    def.click_result = ClickResult::Dismisses;
    def
}

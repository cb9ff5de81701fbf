use comfy_table::{presets::NOTHING, *};
use covid_impact::controls::{Control, ControlValue, PageController};
use itertools::Itertools;

fn table_with_header(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
                .collect_vec(),
        )
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

pub fn pages_table<'a>(pages: impl Iterator<Item = &'a dyn PageController>) -> Table {
    let mut table = table_with_header(&["Page ID", "Title", "Path", "Charts"]);
    for page in pages {
        let meta = page.meta();
        table.add_row(vec![
            meta.id.clone(),
            meta.title.clone(),
            meta.path.clone(),
            page.chart_ids().join(", "),
        ]);
    }
    table
}

fn format_value(value: &ControlValue) -> String {
    match value {
        ControlValue::One(value) => value.clone(),
        ControlValue::Many(values) => values.join(", "),
    }
}

pub fn controls_table(controls: &[Control]) -> Table {
    let mut table = table_with_header(&["Control ID", "Label", "Kind", "Default", "Options"]);
    for control in controls {
        table.add_row(vec![
            control.id.clone(),
            control.label.clone(),
            control.kind.to_string(),
            format_value(&control.default),
            control.options.iter().map(|option| &option.value).join(", "),
        ]);
    }
    table
}

pub fn display_pages<'a>(pages: impl Iterator<Item = &'a dyn PageController>) {
    println!("\n{}", pages_table(pages));
}

pub fn display_controls(controls: &[Control]) {
    println!("\n{}", controls_table(controls));
}

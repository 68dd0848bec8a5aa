use super::ui;
use crate::core::provider::BarProvider;
use comfy_table::Cell;
use std::sync::Arc;

/// Configured providers in the order they are consulted.
pub fn display_as_table(providers: &[Arc<dyn BarProvider>], refresh: bool) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Priority"),
        ui::header_cell("Provider"),
        ui::header_cell("Source"),
        ui::header_cell("Available"),
    ]);

    for (index, provider) in providers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(provider.name()),
            Cell::new(provider.source()),
            ui::flag_cell(provider.is_available()),
        ]);
    }

    let mut output = table.to_string();
    if !refresh {
        output.push_str(&format!(
            "\n{}",
            ui::style_text("Refresh is disabled: only cached data is used", ui::StyleType::Subtle)
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CsvDirProvider;

    #[test]
    fn test_sources_table() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Arc<dyn BarProvider>> = vec![
            Arc::new(CsvDirProvider::new(dir.path())),
            Arc::new(CsvDirProvider::new(dir.path().join("absent"))),
        ];

        let table = display_as_table(&providers, false);
        assert!(table.contains("csv"));
        assert!(table.contains("manual"));
        assert!(table.contains("yes"));
        assert!(table.contains("no"));
        assert!(table.contains("Refresh is disabled"));
    }
}

//! Follow-up category listing

use prettytable::{row, Table};

use crate::vision::FollowUpCategory;

/// Builds the key/label table.
pub fn categories_table() -> Table {
    let mut table = Table::new();
    table.add_row(row!["Key", "Label"]);
    for category in FollowUpCategory::ALL {
        table.add_row(row![category.key(), category.label()]);
    }
    table
}

/// Prints every follow-up category.
pub fn list() {
    categories_table().printstd();
}

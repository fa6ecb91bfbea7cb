pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{empty, error, header, info, section, success, warn};
pub use table::{ci_detail_table, ci_table, hierarchy_table, stats_table, type_table, TableBuilder};
pub use theme::{theme, Theme};

use tabled::{settings::Style, Table, Tabled};
use crate::ci_type::CiType;
use crate::hierarchy::Hierarchy;
use crate::item::ConfigItem;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            field: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Tabled)]
struct CiRow {
    #[tabled(rename = "ID")]
    ci_id: i64,
    #[tabled(rename = "Type")]
    type_id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Env")]
    environment: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Owner")]
    owner: String,
}

#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "ID")]
    type_id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Mandatory fields")]
    mandatory: String,
}

#[derive(Tabled)]
struct HierarchyRow {
    #[tabled(rename = "ID")]
    hierarchy_id: i64,
    #[tabled(rename = "Parent")]
    parent_id: i64,
    #[tabled(rename = "Relation")]
    hierarchy_type: String,
    #[tabled(rename = "Child")]
    child_id: i64,
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// One row per CI with the most commonly scanned columns
pub fn ci_table(items: &[ConfigItem]) -> String {
    let rows: Vec<CiRow> = items
        .iter()
        .map(|ci| CiRow {
            ci_id: ci.ci_id,
            type_id: ci.type_id,
            name: or_dash(ci.name.as_deref()),
            environment: or_dash(ci.environment.map(|e| e.as_str())),
            status: or_dash(ci.status.as_deref()),
            owner: or_dash(ci.owner.as_deref()),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Every attribute of a single CI as field/value rows
pub fn ci_detail_table(ci: &ConfigItem) -> String {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

    let mut builder = TableBuilder::new();
    builder.add_row("ci_id", &ci.ci_id.to_string());
    builder.add_row("type_id", &ci.type_id.to_string());
    builder.add_row("name", &or_dash(ci.name.as_deref()));
    builder.add_row("description", &or_dash(ci.description.as_deref()));
    builder.add_row("serial_number", &or_dash(ci.serial_number.as_deref()));
    builder.add_row("version", &or_dash(ci.version.as_deref()));
    builder.add_row("acquisition_date", &date(ci.acquisition_date));
    builder.add_row("status", &or_dash(ci.status.as_deref()));
    builder.add_row("physical_location", &or_dash(ci.physical_location.as_deref()));
    builder.add_row("owner", &or_dash(ci.owner.as_deref()));
    builder.add_row("environment", &or_dash(ci.environment.map(|e| e.as_str())));
    builder.add_row("security_level", &or_dash(ci.security_level.as_deref()));
    builder.add_row("license_number", &or_dash(ci.license_number.as_deref()));
    builder.add_row("license_expiration", &date(ci.license_expiration));
    builder.build()
}

pub fn type_table(types: &[CiType]) -> String {
    let rows: Vec<TypeRow> = types
        .iter()
        .map(|t| TypeRow {
            type_id: t.type_id,
            name: or_dash(t.name.as_deref()),
            mandatory: if t.mandatory_fields.is_empty() {
                "-".to_string()
            } else {
                t.mandatory_fields.join(", ")
            },
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn hierarchy_table(edges: &[Hierarchy]) -> String {
    let rows: Vec<HierarchyRow> = edges
        .iter()
        .map(|h| HierarchyRow {
            hierarchy_id: h.hierarchy_id,
            parent_id: h.parent_id,
            hierarchy_type: h.hierarchy_type.clone(),
            child_id: h.child_id,
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Environment;

    fn sample() -> ConfigItem {
        ConfigItem {
            ci_id: 3,
            type_id: 1,
            name: Some("web-01".to_string()),
            description: None,
            serial_number: None,
            version: None,
            acquisition_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 29),
            status: Some("up".to_string()),
            physical_location: None,
            owner: None,
            environment: Some(Environment::Prod),
            security_level: None,
            license_number: None,
            license_expiration: None,
        }
    }

    #[test]
    fn test_ci_table_contains_values() {
        let table = ci_table(&[sample()]);
        assert!(table.contains("web-01"));
        assert!(table.contains("PROD"));
        assert!(table.contains("Owner"));
    }

    #[test]
    fn test_detail_table_lists_every_field() {
        let table = ci_detail_table(&sample());
        for field in crate::item::CiField::all() {
            assert!(table.contains(field.as_str()), "missing {}", field);
        }
        assert!(table.contains("2024-02-29"));
    }

    #[test]
    fn test_empty_builder_is_empty() {
        assert!(TableBuilder::new().build().is_empty());
    }
}

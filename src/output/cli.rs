use crate::model::Policy;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub fn policies_table(policies: &[Policy]) -> String {
    if policies.is_empty() {
        return "No policies found.".to_string();
    }

    let rows: Vec<PolicyRow> = policies
        .iter()
        .map(|p| PolicyRow {
            id: p.display_id(),
            name: p.name.clone(),
            description: truncate(&p.description, 60),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer description", 10), "a much ...");
    }

    #[test]
    fn test_empty_policies() {
        assert_eq!(policies_table(&[]), "No policies found.");
    }
}

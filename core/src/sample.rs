//! Static demo records served whenever live JobTread data is unavailable.
//!
//! Every record has the shape `{id, title, text, url, metadata}`. The
//! dataset is built once and never mutated.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const APP_BASE_URL: &str = "https://app.jobtread.com";
const DEMO_FOOTER: &str = "*This is demo data for testing the MCP construction connector.*";

static PROJECTS: LazyLock<Vec<Value>> = LazyLock::new(|| {
    vec![
        json!({
            "id": "job_demo_1",
            "title": "Kitchen Remodel - Smith Residence",
            "text": "Complete kitchen renovation including new cabinets, countertops, and appliances. Budget: $50,000. Status: In Progress. Customer: John Smith. Location: 123 Oak Street, Dallas, TX.",
            "url": format!("{APP_BASE_URL}/jobs/demo_1"),
            "metadata": {"type": "residential", "budget": 50000, "status": "in_progress", "customer": "John Smith"}
        }),
        json!({
            "id": "job_demo_2",
            "title": "Office Building Renovation - Downtown",
            "text": "Commercial office space renovation for tech startup. Budget: $250,000. Status: Planning phase. Customer: TechCorp Inc. Location: Downtown Dallas Business District.",
            "url": format!("{APP_BASE_URL}/jobs/demo_2"),
            "metadata": {"type": "commercial", "budget": 250000, "status": "planning", "customer": "TechCorp Inc"}
        }),
        json!({
            "id": "job_demo_3",
            "title": "Bathroom Remodel - Johnson Home",
            "text": "Master bathroom renovation with luxury finishes. Budget: $35,000. Status: Completed. Customer: Sarah Johnson. Project included new tile, vanity, and fixtures.",
            "url": format!("{APP_BASE_URL}/jobs/demo_3"),
            "metadata": {"type": "residential", "budget": 35000, "status": "completed", "customer": "Sarah Johnson"}
        }),
    ]
});

static CUSTOMERS: LazyLock<Vec<Value>> = LazyLock::new(|| {
    vec![
        json!({
            "id": "customer_demo_1",
            "title": "John Smith - Residential Customer",
            "text": "Long-term residential customer with 3 completed projects. Total project value: $125,000. Excellent payment history. Prefers modern design styles.",
            "url": format!("{APP_BASE_URL}/customers/demo_1"),
            "metadata": {"type": "residential", "projects": 3, "total_value": 125000, "status": "active"}
        }),
        json!({
            "id": "customer_demo_2",
            "title": "TechCorp Inc - Commercial Client",
            "text": "Growing tech company needing office renovations. Budget range: $200k-500k. Focus on modern, collaborative workspaces. Fast decision-making process.",
            "url": format!("{APP_BASE_URL}/customers/demo_2"),
            "metadata": {"type": "commercial", "projects": 1, "total_value": 250000, "status": "active"}
        }),
    ]
});

/// Which sample collection a `list` request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    #[default]
    Jobs,
    Customers,
}

impl Collection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "jobs" | "job" | "projects" | "project" => Some(Self::Jobs),
            "customers" | "customer" | "clients" | "client" => Some(Self::Customers),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::Customers => "customers",
        }
    }
}

/// Projects followed by customers.
pub fn all() -> Vec<Value> {
    PROJECTS.iter().chain(CUSTOMERS.iter()).cloned().collect()
}

pub fn list(collection: Collection) -> Vec<Value> {
    match collection {
        Collection::Jobs => PROJECTS.clone(),
        Collection::Customers => CUSTOMERS.clone(),
    }
}

/// Case-insensitive substring match over each record's serialized form.
///
/// Falls back to the full sample set when nothing matches, so a caller
/// always sees some data.
pub fn search(query: &str) -> Vec<Value> {
    let needle = query.trim().to_lowercase();
    let records = all();
    let matches: Vec<Value> = records
        .iter()
        .filter(|record| record.to_string().to_lowercase().contains(&needle))
        .cloned()
        .collect();
    if matches.is_empty() { records } else { matches }
}

pub fn fetch(id: &str) -> Value {
    if let Some(project) = PROJECTS.iter().find(|p| record_id(p) == Some(id)) {
        return with_text(project, project_detail(project));
    }
    if let Some(customer) = CUSTOMERS.iter().find(|c| record_id(c) == Some(id)) {
        return with_text(customer, customer_detail(customer));
    }
    placeholder(id)
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn with_text(record: &Value, text: String) -> Value {
    let mut enhanced = record.clone();
    enhanced["text"] = Value::String(text);
    enhanced
}

fn field<'a>(record: &'a Value, pointer: &str) -> &'a str {
    record.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn amount(record: &Value, pointer: &str) -> String {
    let raw = record.pointer(pointer).and_then(Value::as_u64).unwrap_or(0);
    format!("${}", group_thousands(raw))
}

fn project_detail(project: &Value) -> String {
    format!(
        "# {title}\n\n\
         ## Project Overview\n\
         - **Budget:** {budget}\n\
         - **Status:** {status}\n\
         - **Customer:** {customer}\n\
         - **Type:** {kind}\n\n\
         ## Project Details\n\
         {text}\n\n\
         ## Recent Activity\n\
         - Project planning completed\n\
         - Materials ordered and delivered\n\
         - Work crew assigned\n\
         - Permits obtained\n\n\
         ## Next Steps\n\
         - Continue with scheduled installation\n\
         - Quality control inspections\n\
         - Customer progress review meeting\n\n\
         {DEMO_FOOTER}",
        title = field(project, "/title"),
        budget = amount(project, "/metadata/budget"),
        status = title_case(&field(project, "/metadata/status").replace('_', " ")),
        customer = field(project, "/metadata/customer"),
        kind = title_case(field(project, "/metadata/type")),
        text = field(project, "/text"),
    )
}

fn customer_detail(customer: &Value) -> String {
    let projects = customer
        .pointer("/metadata/projects")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    format!(
        "# {title}\n\n\
         ## Customer Information\n\
         - **Type:** {kind} Client\n\
         - **Total Projects:** {projects}\n\
         - **Total Value:** {value}\n\
         - **Status:** {status}\n\n\
         ## Details\n\
         {text}\n\n\
         ## Project History\n\
         - All projects completed on time and within budget\n\
         - Excellent communication throughout projects\n\
         - Prefers email communication for updates\n\n\
         {DEMO_FOOTER}",
        title = field(customer, "/title"),
        kind = title_case(field(customer, "/metadata/type")),
        value = amount(customer, "/metadata/total_value"),
        status = title_case(field(customer, "/metadata/status")),
        text = field(customer, "/text"),
    )
}

fn placeholder(id: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Demo Construction Item: {id}"),
        "text": format!(
            "# Demo Construction Project\n\n\
             ## Project Overview\n\
             This is a demo construction project for testing the MCP connector.\n\n\
             **Item ID:** {id}\n\
             **Type:** Construction Project\n\
             **Status:** Demo Mode\n\n\
             *Connect your JobTread grant key and organization to access live project data.*"
        ),
        "url": format!("{APP_BASE_URL}/items/{id}"),
        "metadata": {"type": "demo", "status": "testing"}
    })
}

fn title_case(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_serialized_form_case_insensitively() {
        let results = search("KITCHEN");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "job_demo_1");
    }

    #[test]
    fn search_matches_metadata_fields() {
        let ids: Vec<String> = search("commercial")
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["job_demo_2", "customer_demo_2"]);
    }

    #[test]
    fn search_without_match_returns_full_sample_set() {
        assert_eq!(search("no such thing anywhere").len(), all().len());
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(search("").len(), 5);
    }

    #[test]
    fn fetch_known_project_expands_detail_document() {
        let record = fetch("job_demo_1");
        let text = record["text"].as_str().unwrap();
        assert!(text.starts_with("# Kitchen Remodel - Smith Residence"));
        assert!(text.contains("- **Budget:** $50,000"));
        assert!(text.contains("- **Status:** In Progress"));
        assert_eq!(record["url"], "https://app.jobtread.com/jobs/demo_1");
    }

    #[test]
    fn fetch_known_customer_expands_detail_document() {
        let record = fetch("customer_demo_2");
        let text = record["text"].as_str().unwrap();
        assert!(text.contains("- **Type:** Commercial Client"));
        assert!(text.contains("- **Total Value:** $250,000"));
    }

    #[test]
    fn fetch_unknown_id_builds_placeholder() {
        let record = fetch("job_42");
        assert_eq!(record["id"], "job_42");
        assert_eq!(record["metadata"]["type"], "demo");
        assert_eq!(record["url"], "https://app.jobtread.com/items/job_42");
    }

    #[test]
    fn collection_parse_accepts_aliases() {
        assert_eq!(Collection::parse("Projects"), Some(Collection::Jobs));
        assert_eq!(Collection::parse("client"), Some(Collection::Customers));
        assert_eq!(Collection::parse("invoices"), None);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}

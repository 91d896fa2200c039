// Monitored zone domain model
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub query_key: String,
}

impl Zone {
    pub fn new(id: String, query_key: String, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| Self::format_name(&query_key));
        Self {
            id,
            name,
            query_key,
        }
    }

    fn format_name(query_key: &str) -> String {
        // Convert "temp-humidity/Omega-F4E1/wine_rack" to "Wine Rack"
        let last = query_key.trim_end_matches('/').rsplit('/').next().unwrap_or(query_key);
        last.split(['_', '-', ' '])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

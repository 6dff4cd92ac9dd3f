use flowtrace_core::FlowRecord;

/// Case-insensitive substring match of a fixed token against the request host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFilter {
    token: String,
}

impl HostFilter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().to_lowercase(),
        }
    }

    pub fn matches(&self, record: &FlowRecord) -> bool {
        record.request.host.to_lowercase().contains(&self.token)
    }
}

/// Lazy, order-preserving filter over a record stream. Restart by re-invoking
/// with a fresh source.
pub fn filter_records<'a, I>(
    records: I,
    filter: Option<&'a HostFilter>,
) -> impl Iterator<Item = FlowRecord> + 'a
where
    I: Iterator<Item = FlowRecord> + 'a,
{
    records.filter(move |record| filter.is_none_or(|f| f.matches(record)))
}

#[cfg(test)]
mod tests {
    use flowtrace_core::{FlowRecord, RequestData};

    use super::{HostFilter, filter_records};

    fn record_for_host(host: &str) -> FlowRecord {
        FlowRecord {
            started_at_unix_ms: 0,
            request: RequestData {
                method: "GET".to_string(),
                url: format!("https://{host}/"),
                scheme: "https".to_string(),
                host: host.to_string(),
                port: 443,
                path: "/".to_string(),
                headers: Vec::new(),
                cookies: Vec::new(),
            },
            response: None,
            request_body: None,
            response_body: None,
        }
    }

    #[test]
    fn substring_match_keeps_original_order() {
        let records = vec![
            record_for_host("api.example.com"),
            record_for_host("cdn.example.com"),
            record_for_host("example.org"),
        ];
        let filter = HostFilter::new("example.com");
        let kept: Vec<FlowRecord> = filter_records(records.into_iter(), Some(&filter)).collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].request.host, "api.example.com");
        assert_eq!(kept[1].request.host, "cdn.example.com");
    }

    #[test]
    fn match_is_case_insensitive() {
        let filter = HostFilter::new("EXAMPLE.com");
        assert!(filter.matches(&record_for_host("api.Example.COM")));
        assert!(!filter.matches(&record_for_host("example.org")));
    }

    #[test]
    fn absent_filter_keeps_everything() {
        let records = vec![record_for_host("a.net"), record_for_host("b.net")];
        let kept: Vec<FlowRecord> = filter_records(records.into_iter(), None).collect();
        assert_eq!(kept.len(), 2);
    }
}

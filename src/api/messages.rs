const MESSAGES_ENDPOINT: &str = "/gmail/v1/users/me/messages";

/// Headers requested by the metadata-only fetch used for classification.
pub const METADATA_HEADERS: [&str; 6] = ["content-type", "from", "to", "subject", "date", "message-id"];

pub fn list_endpoint() -> &'static str {
    MESSAGES_ENDPOINT
}

pub fn message_endpoint(id: &str) -> String {
    format!("{MESSAGES_ENDPOINT}/{id}")
}

pub fn attachment_endpoint(message_id: &str, attachment_id: &str) -> String {
    format!("{MESSAGES_ENDPOINT}/{message_id}/attachments/{attachment_id}")
}

pub fn send_endpoint() -> String {
    format!("{MESSAGES_ENDPOINT}/send")
}

pub fn metadata_query() -> Vec<(String, String)> {
    let mut query = vec![("format".to_string(), "metadata".to_string())];
    for header in METADATA_HEADERS {
        query.push(("metadataHeaders".to_string(), header.to_string()));
    }
    query
}

pub fn list_query(search: &str, page_size: u32, page_token: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![
        ("q".to_string(), search.to_string()),
        ("maxResults".to_string(), page_size.to_string()),
    ];
    if let Some(token) = page_token {
        params.push(("pageToken".to_string(), token.to_string()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_carries_page_token_only_when_present() {
        let first = list_query("in:inbox", 15, None);
        assert!(first.iter().all(|(key, _)| key != "pageToken"));

        let next = list_query("in:inbox", 15, Some("next"));
        assert!(next.contains(&("pageToken".to_string(), "next".to_string())));
        assert!(next.contains(&("maxResults".to_string(), "15".to_string())));
    }

    #[test]
    fn metadata_query_repeats_header_param() {
        let query = metadata_query();
        let headers = query.iter().filter(|(key, _)| key == "metadataHeaders").count();
        assert_eq!(headers, METADATA_HEADERS.len());
    }
}

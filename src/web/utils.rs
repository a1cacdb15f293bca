//! Web utility functions

use tracing::info;
use uuid::Uuid;

use super::extractors::RequestContext;

/// Log an incoming HTTP request
pub fn log_request(context: &RequestContext) {
    info!(
        method = %context.method,
        uri = %context.uri,
        request_id = %context.request_id,
        actor = ?context.actor,
        user_agent = ?context.user_agent,
        real_ip = ?context.real_ip,
        "HTTP request"
    );
}

/// Extract UUID from path parameter
pub fn extract_uuid_param(param: &str) -> Result<Uuid, String> {
    Uuid::parse_str(param).map_err(|_| format!("Invalid UUID format: {}", param))
}

/// Strip directory components and control characters from an uploaded file name
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control())
        .take(255)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_uuid_param() {
        let uuid = Uuid::new_v4();
        assert_eq!(extract_uuid_param(&uuid.to_string()).unwrap(), uuid);
        assert!(extract_uuid_param("invalid-uuid").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\kitten.jpg"), "kitten.jpg");
        assert_eq!(sanitize_file_name(" tom\n.png "), "tom.png");
    }
}

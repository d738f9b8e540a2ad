use serde_json::{Value, json};

/// `"Trash failed. Missing sheet: Trash"`
pub fn failure_message(action: &str, error: &anyhow::Error) -> String {
    crate::cloud::format_cloud_error(action, error)
}

pub fn envelope_for(action: &str, error: &anyhow::Error) -> Value {
    json!({
        "ok": false,
        "action": action,
        "error": format!("{error:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RegistryError;

    #[test]
    fn failure_line_names_the_action() {
        let err: anyhow::Error = RegistryError::MissingSheet("Trash".into()).into();
        assert_eq!(failure_message("Trash", &err), "Trash failed. Missing sheet: Trash");
        assert_eq!(envelope_for("Restore", &err)["error"], "Missing sheet: Trash");
    }
}

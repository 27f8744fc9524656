//! Filesystem-safe tokens for resource identifiers
//!
//! `:` becomes `#`, `/` becomes `_`, space becomes `+`. The replacement
//! characters (and `%`) are percent-escaped when they occur literally, so
//! the mapping is injective: distinct identifiers never share a token.

/// Map an identifier to a single path component
pub fn fs_token(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '_' => out.push_str("%5F"),
            '+' => out.push_str("%2B"),
            ':' => out.push('#'),
            '/' => out.push('_'),
            ' ' => out.push('+'),
            '\\' => out.push_str("%5C"),
            '\0' => out.push_str("%00"),
            c => out.push(c),
        }
    }
    match out.as_str() {
        "" => "%".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => out,
    }
}

/// File name for an artifact: sanitized name plus sanitized extension
pub fn artifact_file_name(name: &str, extension: &str) -> String {
    if extension.is_empty() {
        fs_token(name)
    } else {
        format!("{}.{}", fs_token(name), fs_token(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_run_arn_token() {
        assert_eq!(
            fs_token("arn:aws:devicefarm:us-west-2:111122223333:run:P/R"),
            "arn#aws#devicefarm#us-west-2#111122223333#run#P_R"
        );
    }

    #[test]
    fn test_tokens_are_single_components() {
        for input in ["a/b/c", "..", ".", "", "x\\y"] {
            let token = fs_token(input);
            assert!(!token.contains('/'));
            assert!(!token.contains('\\'));
            assert!(token != "." && token != ".." && !token.is_empty());
        }
    }

    #[test]
    fn test_injective_over_representative_arns() {
        let inputs = [
            "arn:aws:devicefarm:us-west-2:111:run:P/R",
            "arn:aws:devicefarm:us-west-2:111:run:P:R",
            "arn:aws:devicefarm:us-west-2:111:run:P R",
            "arn:aws:devicefarm:us-west-2:111:run:P_R",
            "arn:aws:devicefarm:us-west-2:111:run:P#R",
            "arn:aws:devicefarm:us-west-2:111:run:P+R",
            "arn:aws:devicefarm:us-west-2:111:run:P%23R",
            "arn:aws:devicefarm:us-west-2:111:run:P%R",
            "arn:aws:devicefarm:us-west-2:111:artifact:P/R/J/S/00000",
            "arn:aws:devicefarm:us-west-2:111:artifact:P/R/J/S/00001",
            "arn:aws:devicefarm:us-west-2:111:artifact:P/R/J_S/00000",
            "arn:aws:devicefarm:us-west-2:111:artifact:P/R/J S/00000",
            "Customer Artifacts",
            "Customer_Artifacts",
            "Customer+Artifacts",
            "Customer/Artifacts",
            "Customer:Artifacts",
        ];

        let tokens: HashSet<String> = inputs.iter().map(|s| fs_token(s)).collect();
        assert_eq!(tokens.len(), inputs.len());
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(artifact_file_name("Customer Artifacts", "zip"), "Customer+Artifacts.zip");
        assert_eq!(artifact_file_name("TCP dump", ""), "TCP+dump");
        assert_eq!(artifact_file_name("crash_1", "crash"), "crash%5F1.crash");
    }
}

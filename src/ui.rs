use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    eprintln!();
    eprintln!("{}", title.bold());
    eprintln!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    eprintln!("  {}: {}", key.dimmed(), value);
}

/// Shorten a value for display, keeping the start
pub fn truncate_value(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else if max_chars <= 3 {
        "...".to_string()
    } else {
        let head: String = value.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_value_short() {
        assert_eq!(truncate_value("short", 20), "short");
        assert_eq!(truncate_value("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_value_long() {
        assert_eq!(
            truncate_value(r#"[{"s3-bucket-deployment_abc_123":{}}]"#, 15),
            r#"[{"s3-bucket..."#
        );
    }

    #[test]
    fn test_truncate_value_multibyte() {
        assert_eq!(truncate_value("déploiement", 6), "dép...");
    }

    #[test]
    fn test_truncate_value_edge_cases() {
        assert_eq!(truncate_value("test", 3), "...");
        assert_eq!(truncate_value("", 10), "");
    }
}

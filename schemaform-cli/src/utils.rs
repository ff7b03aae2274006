//! Placeholder expansion and terminal output helpers.

use colored::Colorize;
use schemaform::Diagnostics;

/// Replace every `${env:VAR}` placeholder in `input` with the value of the
/// environment variable `VAR`.
///
/// Unset variables expand to an empty string. Other `${...}` placeholders
/// and unterminated ones are kept as written.
///
/// # Example
///
/// ```rust
/// use schemaform_cli::utils::replace_env_placeholders;
///
/// unsafe { std::env::set_var("FORM_DIR", "/srv/forms"); }
/// let path = replace_env_placeholders("${env:FORM_DIR}/user.json").unwrap();
/// assert_eq!(path, "/srv/forms/user.json");
/// ```
pub fn replace_env_placeholders(input: &str) -> anyhow::Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut placeholder = String::new();
        let mut depth = 1;
        let mut closed = false;
        for ch in chars.by_ref() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        closed = true;
                        break;
                    }
                }
                _ => {}
            }
            placeholder.push(ch);
        }

        match placeholder.strip_prefix("env:") {
            Some(name) if closed => match std::env::var(name) {
                Ok(value) => {
                    debug!("expanded ${{env:{name}}} to {value}");
                    result.push_str(&value);
                }
                Err(_) => debug!("environment variable {name} is not set"),
            },
            _ => {
                result.push_str("${");
                result.push_str(&placeholder);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    Ok(result)
}

/// Print collected diagnostics to stderr, one colored line each.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!(
            "{} [{}] {}: {}",
            "warning".yellow().bold(),
            diagnostic.kind,
            diagnostic.source.purple(),
            diagnostic.message
        );
    }
    if !diagnostics.is_empty() {
        eprintln!(
            "{}",
            format!("{} diagnostic(s) reported", diagnostics.len())
                .yellow()
                .bold()
        );
    }
}

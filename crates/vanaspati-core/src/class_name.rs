//! Display formatting for classifier class names.
//!
//! The classifier labels look like `Tomato___Late_blight`: plant and
//! condition separated by a triple underscore, words by single underscores.
//! Two sub-categories use a double underscore after the separator
//! (`Corn___maize__Common_rust_`, `Cherry___including_sour__Powdery_mildew`).

use std::sync::OnceLock;

use regex::Regex;

const SEPARATOR: &str = "___";
const MAIZE: &str = "maize__";
const SOUR: &str = "including_sour__";

fn trailing_dash() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*-\s*$").expect("static regex"))
}

fn abbreviations() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        ["YLCV", "TMV", "CMV"]
            .into_iter()
            .map(|abbr| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", abbr)).expect("static regex");
                (re, abbr)
            })
            .collect()
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn capitalize_keep_paren(word: &str) -> String {
    match word.strip_prefix('(') {
        Some(rest) => format!("({}", capitalize(rest)),
        None => capitalize(word),
    }
}

/// Human-readable form of a class name.
///
/// `Tomato___Late_blight` becomes `Tomato - Late Blight`,
/// `Corn___maize__Common_rust_` becomes `Corn (Maize) - Common Rust`.
pub fn format_class_name(class_name: &str) -> String {
    if class_name.is_empty() {
        return String::new();
    }

    let maize = format!("{}{}", SEPARATOR, MAIZE);
    let sour = format!("{}{}", SEPARATOR, SOUR);

    let formatted = if class_name.contains(&maize) {
        class_name.replacen(&maize, " (Maize) - ", 1)
    } else if class_name.contains(&sour) {
        class_name.replacen(&sour, " (Sour) - ", 1)
    } else {
        class_name.replace(SEPARATOR, " - ")
    };

    let formatted = formatted.replace('_', " ");
    let formatted = trailing_dash().replace(formatted.trim(), "");

    let mut formatted = formatted
        .split(' ')
        .map(capitalize_keep_paren)
        .collect::<Vec<_>>()
        .join(" ");

    for (re, abbr) in abbreviations() {
        formatted = re.replace_all(&formatted, *abbr).into_owned();
    }

    formatted
}

/// Plant part of a class name: `Tomato___Late_blight` → `Tomato`.
pub fn plant_name_of(class_name: &str) -> String {
    class_name
        .split(SEPARATOR)
        .next()
        .unwrap_or_default()
        .replace('_', " ")
        .trim()
        .to_string()
}

/// Condition part of a class name: `Tomato___Late_blight` → `Late Blight`.
///
/// Returns `Unknown` when the name has no plant/condition separator.
pub fn disease_name_of(class_name: &str) -> String {
    if class_name.is_empty() {
        return String::new();
    }

    let Some((_, disease)) = class_name.split_once(SEPARATOR) else {
        return "Unknown".to_string();
    };
    // Only the segment right after the separator counts.
    let disease = disease.split(SEPARATOR).next().unwrap_or_default();
    let disease = disease
        .strip_prefix(MAIZE)
        .or_else(|| disease.strip_prefix(SOUR))
        .unwrap_or(disease);

    disease
        .replace('_', " ")
        .trim()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for the classifier's healthy-leaf classes.
pub fn is_healthy(class_name: &str) -> bool {
    class_name.to_lowercase().ends_with("healthy")
}

use case::CaseExt;

// Runs of capitals that would otherwise be split one letter per word.
const ACRONYMS: [(&str, &str); 3] = [("TIN", "Tin"), ("KS", "Ks"), ("FD", "Fd")];

/// Converts a snake_case tool name to the UpperCamelCase form the
/// executable expects in `--run=`. Names already in CamelCase pass through.
pub fn to_camelcase(tool_name: &str) -> String {
    let name = tool_name.trim();
    if !name.contains('_') && name.chars().next().map_or(false, |c| c.is_uppercase()) {
        return name.to_string();
    }
    name.to_camel()
}

/// Converts a CamelCase tool name, as printed by `--listtools`, to snake_case.
pub fn to_snakecase(tool_name: &str) -> String {
    let mut name = tool_name.trim().to_string();
    for (acronym, word) in ACRONYMS {
        name = name.replace(acronym, word);
    }
    name.to_snake()
}

use crate::signature::PreservedParam;

pub const WRAPPERS_MARKER: &str = "// Static wrappers";

/* `#include` lines for every header, sorted and without repeats */
pub fn emit_includes(headers: &[String]) -> String {
    let mut sorted: Vec<&str> = headers.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = String::new();
    for header in sorted {
        out.push_str(&format!("#include \"{}\"\n", header));
    }
    out
}

/* Declarator list for a definition; an empty list is spelled `void` */
pub fn format_param_list(params: &[PreservedParam]) -> String {
    if params.is_empty() {
        return "void".to_string();
    }
    params
        .iter()
        .map(|p| p.ty.declare(&p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_arg_list(params: &[PreservedParam]) -> String {
    params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_are_sorted_and_unique() {
        let headers = vec![
            "/usr/include/flint/fmpz.h".to_string(),
            "/usr/include/flint/acb.h".to_string(),
            "/usr/include/flint/fmpz.h".to_string(),
        ];
        assert_eq!(
            emit_includes(&headers),
            "#include \"/usr/include/flint/acb.h\"\n#include \"/usr/include/flint/fmpz.h\"\n"
        );
        assert_eq!(emit_includes(&[]), "");
    }
}

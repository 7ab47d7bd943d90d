/// The two textual rewrites §4.6 specifies before compilation:
/// `#N` -> a builtin call resolving the dbref at runtime, and
/// `class:Name` -> a builtin call looking up the class by name. Both are
/// conservative: they do not fire inside string literals or `//` comments.
pub fn preprocess(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                        out.push(chars[i]);
                        i += 1;
                        continue;
                    }
                    if chars[i] == '"' {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '#' if chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                let digits: String = chars[start..j].iter().collect();
                out.push_str(&format!("find_object_by_dbref({digits})"));
                i = j;
            }
            c if is_ident_start(c) && matches_keyword(&chars, i, "class:") => {
                let after_prefix = i + "class:".len();
                let mut j = after_prefix;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                let name: String = chars[after_prefix..j].iter().collect();
                out.push_str(&format!("get_class(\"{name}\")"));
                i = j;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn matches_keyword(chars: &[char], at: usize, kw: &str) -> bool {
    let kw_chars: Vec<char> = kw.chars().collect();
    if at + kw_chars.len() > chars.len() {
        return false;
    }
    chars[at..at + kw_chars.len()] == kw_chars[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_dbref_literal() {
        assert_eq!(preprocess("return #42;"), "return find_object_by_dbref(42);");
    }

    #[test]
    fn rewrites_class_reference() {
        assert_eq!(preprocess("x = class:Room;"), "x = get_class(\"Room\");");
    }

    #[test]
    fn leaves_string_contents_untouched() {
        assert_eq!(preprocess(r##"return "#42 is not a ref";"##), r##"return "#42 is not a ref";"##);
    }

    #[test]
    fn leaves_comments_untouched() {
        assert_eq!(preprocess("// see #42\nreturn 1;"), "// see #42\nreturn 1;");
    }
}

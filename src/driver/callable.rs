use regex::Regex;

lazy_static::lazy_static! {
    static ref CALL_ESCAPE: Regex =
        Regex::new(r"(?is)^\s*\{\s*(\?\s*=\s*)?call\s+([\w.$#]+)").expect("call escape pattern");
}

/// Result of inspecting command text for a procedure call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallableDetail {
    pub is_callable: bool,
    /// `{ ? = call ... }` form: the procedure returns its cursor
    pub has_return: bool,
    pub function_name: String,
}

/// Decides whether command text is a stored procedure invocation
pub trait CallableParser: Send + Sync {
    fn parse(&self, command_text: &str) -> CallableDetail;
}

/// Recognises the `{ call name(...) }` and `{ ? = call name(...) }` escapes
#[derive(Debug, Default, Clone, Copy)]
pub struct EscapeCallableParser;

impl CallableParser for EscapeCallableParser {
    fn parse(&self, command_text: &str) -> CallableDetail {
        match CALL_ESCAPE.captures(command_text) {
            Some(caps) => CallableDetail {
                is_callable: true,
                has_return: caps.get(1).is_some(),
                function_name: caps[2].to_string(),
            },
            None => CallableDetail::default(),
        }
    }
}

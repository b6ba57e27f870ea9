//! # Routing Header
//!
//! Builds the value of the request routing header from a flat list of parameters.
//!
//! Pairs are joined as `key=value` with `&`, keeping the caller's order. Values are used
//! verbatim: no percent-encoding is applied.

/// Name of the header carrying routing parameters on every outgoing exchange.
pub const ROUTING_HEADER: &str = "x-goog-request-params";

/// Serializes routing parameters into a single header value.
///
/// ```
/// use fallback_core::routing_header::from_params;
///
/// assert_eq!(from_params([("abc", "def")]), "abc=def");
/// assert_eq!(from_params([("a", "1"), ("b", "2")]), "a=1&b=2");
/// ```
pub fn from_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in params {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key.as_ref());
        out.push('=');
        out.push_str(value.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_param() {
        assert_eq!(from_params([("abc", "def")]), "abc=def");
    }

    #[test]
    fn keeps_insertion_order() {
        assert_eq!(from_params([("a", "1"), ("b", "2")]), "a=1&b=2");
        assert_eq!(from_params([("b", "2"), ("a", "1")]), "b=2&a=1");
    }

    #[test]
    fn values_are_not_escaped() {
        let params = vec![
            ("name".to_string(), "projects/p/locations/l".to_string()),
            ("filter".to_string(), "a b".to_string()),
        ];

        assert_eq!(from_params(params), "name=projects/p/locations/l&filter=a b");
    }

    #[test]
    fn empty_params_yield_empty_value() {
        assert_eq!(from_params(Vec::<(&str, &str)>::new()), "");
    }
}

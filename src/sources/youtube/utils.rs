use std::collections::HashMap;

/// Decodes a `key=value&key=value` query string. Later duplicates win.
pub fn get_query_parameters(query: &str) -> HashMap<String, String> {
    let query = query.trim_start_matches('?');
    let mut params = HashMap::new();

    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = part.split_once('=').unwrap_or((part, ""));
        params.insert(decode_component(k), decode_component(v));
    }

    params
}

/// Value of `key` in the query part of `url`, if any.
pub fn get_query_parameter(url: &str, key: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    get_query_parameters(query).remove(key)
}

/// Sets `key` to `value` in the query of `url`, replacing an existing value
/// in place or appending a new pair.
pub fn set_query_parameter(url: &str, key: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (url, None),
    };
    let encoded = format!("{}={}", key, urlencoding::encode(value));

    let mut result = match base.split_once('?') {
        Some((path, query)) => {
            let mut replaced = false;
            let mut pairs: Vec<String> = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| {
                    let name = p.split_once('=').map(|(k, _)| k).unwrap_or(p);
                    if !replaced && decode_component(name) == key {
                        replaced = true;
                        encoded.clone()
                    } else {
                        p.to_string()
                    }
                })
                .collect();

            if !replaced {
                pairs.push(encoded);
            }
            format!("{}?{}", path, pairs.join("&"))
        }
        None => format!("{}?{}", base, encoded),
    };

    if let Some(f) = fragment {
        result.push('#');
        result.push_str(f);
    }
    result
}

/// URL of the byte range `from..=to` of a stream. YouTube's media servers take
/// the range as a query parameter rather than a `Range` header.
pub fn get_segment_url(url: &str, from: u64, to: u64) -> String {
    set_query_parameter(url, "range", &format!("{}-{}", from, to))
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|c| c.into_owned())
        .unwrap_or(s)
}

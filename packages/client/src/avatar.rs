//! Placeholder avatar generation.
//!
//! When a user has no avatar, an inline SVG with the name's first
//! character on a name-derived background color stands in.

const PALETTE: [&str; 8] = [
    "#3498db", "#9b59b6", "#e74c3c", "#f39c12", "#1abc9c", "#2ecc71", "#e67e22", "#95a5a6",
];

/// Resolve an avatar URL: non-empty URLs pass through, everything else
/// gets a generated placeholder.
pub fn avatar_url(avatar: &str, name: &str) -> String {
    if !avatar.trim().is_empty() {
        return avatar.to_string();
    }
    placeholder_data_url(name)
}

/// Inline SVG data URL with the name's first character.
pub fn placeholder_data_url(name: &str) -> String {
    let initial: String = name
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string());
    let color = color_for_name(name);

    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"100\" height=\"100\" viewBox=\"0 0 100 100\">\
         <rect width=\"100\" height=\"100\" fill=\"{color}\"/>\
         <text x=\"50\" y=\"50\" font-family=\"Arial, sans-serif\" font-size=\"48\" font-weight=\"bold\" \
         text-anchor=\"middle\" dominant-baseline=\"central\" fill=\"white\">{initial}</text></svg>"
    );

    format!("data:image/svg+xml;charset=utf-8,{}", encode_uri_component(&svg))
}

/// Pick a color from the palette by summing the name's char codes.
fn color_for_name(name: &str) -> &'static str {
    let hash: u32 = name.chars().map(|c| c as u32).sum();
    PALETTE[(hash % PALETTE.len() as u32) as usize]
}

/// Percent-encode like JavaScript's `encodeURIComponent`, so the data URL
/// survives non-ASCII names.
fn encode_uri_component(input: &str) -> String {
    const UNRESERVED: &str = "-_.!~*'()";
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || UNRESERVED.contains(ch) {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

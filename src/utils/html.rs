/// Sanitises rendered article HTML with ammonia's whitelist.
///
/// Safe formatting tags survive; `<script>`, `<iframe>` and event-handler
/// attributes are stripped, script bodies included.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_markup() {
        let out = clean_html("<h2>Intro</h2><p onclick=\"x()\">hi<script>alert(1)</script></p>");
        assert!(out.contains("<h2>Intro</h2>"));
        assert!(out.contains("<p>hi</p>"));
        assert!(!out.contains("script"));
        assert!(!out.contains("onclick"));
    }
}

use super::*;

fn block(language: &str, code: &str) -> CodeBlock {
    CodeBlock {
        id: format!("{language}-{}", code.len()),
        language: language.to_owned(),
        code: code.to_owned(),
        is_previewable: crate::blocks::is_previewable(language, None),
    }
}

fn preview_block(language: &str, code: &str) -> CodeBlock {
    CodeBlock { is_previewable: true, ..block(language, code) }
}

// =========================================================================
// compose: no HTML base
// =========================================================================

#[test]
fn css_only_gets_style_and_mount_without_script() {
    let doc = compose(&[block("css", ".a{color:red}")]).unwrap();
    let html = doc.as_str();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<style>\n.a{color:red}\n</style>"));
    assert!(html.contains("id=\"preview\""));
    assert!(!html.contains("<script"));
}

#[test]
fn script_only_wraps_code_and_echoes_console() {
    let doc = compose(&[block("javascript", "const x = 1;")]).unwrap();
    let html = doc.as_str();
    assert!(html.contains("<script>\nconst x = 1;\n</script>"));
    assert!(html.contains("<div id=\"output\"></div>"));
    assert!(html.contains("getElementById('output')"));
    assert!(html.contains("textContent"));
}

#[test]
fn css_and_script_share_a_mount_node() {
    let doc = compose(&[block("css", "#root{margin:0}"), block("js", "console.log(1)")]).unwrap();
    let html = doc.as_str();
    assert!(html.contains("<div id=\"root\"></div>"));
    assert!(html.contains("<style>\n#root{margin:0}\n</style>"));
    assert!(html.contains("<script>\nconsole.log(1)\n</script>"));
}

#[test]
fn multiple_css_and_script_blocks_concatenate_in_order() {
    let blocks =
        [block("css", ".a{}"), block("ts", "let a = 1;"), block("css", ".b{}"), block("jsx", "let b = 2;")];
    let html = compose(&blocks).unwrap().into_string();
    assert!(html.contains(".a{}\n\n.b{}"));
    assert!(html.contains("let a = 1;\n\nlet b = 2;"));
}

// =========================================================================
// compose: HTML base
// =========================================================================

#[test]
fn full_document_gets_style_before_head_close_and_body_untouched() {
    let base = "<!DOCTYPE html>\n<html>\n<head><title>T</title></head>\n<body><p id=\"x\">hello</p></body>\n</html>";
    let doc = compose(&[block("html", base), block("css", "p{color:blue}")]).unwrap();
    let html = doc.as_str();
    let style_at = html.find("<style>").unwrap();
    let head_close = html.find("</head>").unwrap();
    assert!(style_at < head_close);
    assert!(html.contains("<body><p id=\"x\">hello</p></body>"));
    assert!(!html.contains("<script"));
}

#[test]
fn full_document_gets_script_before_body_close() {
    let base = "<html><head></head><BODY><p>hi</p></BODY></html>";
    let html = compose(&[block("html", base), block("js", "run()")])
        .unwrap()
        .into_string();
    let script_at = html.find("<script>").unwrap();
    let body_close = html.find("</BODY>").unwrap();
    assert!(script_at < body_close);
    assert!(html.find("<p>hi</p>").unwrap() < script_at);
}

#[test]
fn full_document_without_head_or_body_prepends_style_and_appends_script() {
    let base = "<html><p>bare</p></html>";
    let html = compose(&[block("html", base), block("css", "p{}"), block("js", "go()")])
        .unwrap()
        .into_string();
    assert!(html.starts_with("<style>"));
    assert!(html.trim_end().ends_with("</script>"));
}

#[test]
fn fragment_base_is_wrapped_with_injections() {
    let html = compose(&[block("html", "<button>Go</button>"), block("css", "button{}"), block("js", "go()")])
        .unwrap()
        .into_string();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<button>Go</button>"));
    assert!(html.find("button{}").unwrap() < html.find("</head>").unwrap());
    assert!(html.find("go()").unwrap() > html.find("<button>Go</button>").unwrap());
}

#[test]
fn last_html_block_wins_as_base() {
    let html = compose(&[block("html", "<p>first</p>"), block("html", "<p>second</p>")])
        .unwrap()
        .into_string();
    assert!(html.contains("<p>second</p>"));
    assert!(!html.contains("<p>first</p>"));
}

#[test]
fn non_previewable_blocks_are_ignored() {
    let html = compose(&[block("python", "print('<p>')"), block("css", ".a{}")])
        .unwrap()
        .into_string();
    assert!(!html.contains("print"));
}

// =========================================================================
// compose: fallback and errors
// =========================================================================

#[test]
fn unknown_previewable_kind_uses_content_sniffing() {
    let doc = compose(&[preview_block("svg", "<svg><circle r=\"4\"/></svg>")]).unwrap();
    assert!(doc.as_str().contains("<body>\n<svg><circle r=\"4\"/></svg>\n"));
}

#[test]
fn nothing_previewable_is_empty_error() {
    assert!(matches!(compose(&[block("python", "x")]), Err(ComposeError::Empty)));
    assert!(matches!(compose(&[]), Err(ComposeError::Empty)));
}

#[test]
fn embedded_closing_script_tag_is_escaped() {
    let html = compose(&[block("js", "document.write('</script>' + '</SCRIPT>')")]).unwrap().into_string();
    assert!(html.contains("<script>\ndocument.write('<\\/script>' + '<\\/SCRIPT>')\n</script>"));
    assert_eq!(html.matches("</script>").count(), 2, "echo shim and injected script only");
}

#[test]
fn embedded_closing_style_tag_is_rejected() {
    let err = compose(&[block("css", "a{}</style>")]).unwrap_err();
    assert!(matches!(err, ComposeError::EmbeddedClosingTag { tag: "style", .. }));
    assert_eq!(err.error_code(), "E_COMPOSE_EMBEDDED_TAG");
}

#[test]
fn compose_or_raw_falls_back_to_latest_raw_code() {
    let blocks = [block("css", "a{}</STYLE>")];
    assert_eq!(compose_or_raw(&blocks), "a{}</STYLE>");
}

#[test]
fn compose_or_raw_is_empty_without_previewable_blocks() {
    assert_eq!(compose_or_raw(&[block("rust", "fn main() {}")]), "");
}

#[test]
fn composition_is_idempotent() {
    let blocks = [block("html", "<div>x</div>"), block("css", ".x{}"), block("js", "let y = 2;")];
    let first = compose(&blocks).unwrap();
    let second = compose(&blocks).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str().as_bytes(), second.as_str().as_bytes());
}

// =========================================================================
// wrap_in_document
// =========================================================================

#[test]
fn wrap_returns_full_documents_unchanged() {
    let code = "<!doctype html><html><body>hi</body></html>";
    assert_eq!(wrap_in_document(code).as_str(), code);
}

#[test]
fn wrap_detects_bare_css() {
    let html = wrap_in_document(".card { color: #fff; margin: 0 auto; }").into_string();
    assert!(html.contains("<style>\n.card { color: #fff; margin: 0 auto; }\n</style>"));
    assert!(!html.contains("<script"));
}

#[test]
fn wrap_detects_css_with_comments_urls_and_combinators() {
    let code = "/* cards */\n.list > li + li { background: url(img/a.png); }\na[href~=x] { color: red; }";
    let html = wrap_in_document(code).into_string();
    assert!(html.contains("id=\"preview\""));
    assert!(html.contains(&format!("<style>\n{code}\n</style>")));
}

#[test]
fn wrap_detects_bare_script() {
    let html = wrap_in_document("const f = () => console.log('hi');").into_string();
    assert!(html.contains("id=\"output\""));
    assert!(html.contains("<script>\nconst f = () => console.log('hi');\n</script>"));
}

#[test]
fn wrap_treats_braced_function_as_script_not_css() {
    let html = wrap_in_document("function a() { b(); }").into_string();
    assert!(html.contains("id=\"output\""));
}

#[test]
fn wrap_keeps_css_with_let_inside_identifier() {
    let html = wrap_in_document(".outlet { padding: 1px; }").into_string();
    assert!(html.contains("id=\"preview\""));
}

#[test]
fn wrap_falls_back_to_body_fragment() {
    let html = wrap_in_document("<h1>Title</h1>").into_string();
    assert!(html.contains("<body>\n<h1>Title</h1>\n</body>"));
}

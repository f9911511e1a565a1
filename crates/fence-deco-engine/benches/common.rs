// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\nParagraph with some content.\n\n```rust title:\"Example\" ln:10 hl:2\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n- Bullet point\n- Another item\n\n";
    base.repeat(size)
}

/// Document alternating plain fences with callouts that contain fences.
#[allow(dead_code)]
pub fn generate_callout_document(sections: usize) -> String {
    let mut content = String::new();

    for section in 0..sections {
        content.push_str(&format!("## Section {}\n\n", section));
        content.push_str(&format!(
            "```python title:\"Block {}\"\ndef f_{}():\n    return {}\n```\n\n",
            section, section, section
        ));
        content.push_str("> [!note] Snippet\n");
        content.push_str(&format!(
            "> ```js hl:1\n> const v{} = {};\n> console.log(v{});\n> ```\n\n",
            section, section, section
        ));
    }

    content
}

/// The code text of the last plain block in [`generate_callout_document`],
/// the worst case for content matching.
#[allow(dead_code)]
pub fn last_block_code(sections: usize) -> String {
    let last = sections.saturating_sub(1);
    format!("def f_{}():\n    return {}\n", last, last)
}

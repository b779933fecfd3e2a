//! Prompt 构建
//!
//! 两种模式共用同一份 JSON 格式要求；章节 JSON 以缩进格式嵌入

use crate::models::BlockNode;

/// 参考资料的最大长度（字符）
pub const MAX_MATERIAL_CHARS: usize = 10_000;

const JSON_RULES: &str = r#"IMPORTANT JSON VALIDITY REQUIREMENTS:
- All strings must use double quotes (")
- Escape all double quotes inside strings with backslash (\")
- Escape all backslashes with double backslash (\\)
- Escape newlines in strings as \n
- No trailing commas
- All property names must be in double quotes
- Ensure proper closing brackets and braces

Do not wrap in markdown code blocks. Do not add explanations. Return the complete JSON array starting with "[" and ending with "]"."#;

fn section_json(nodes: &[BlockNode]) -> String {
    // 节点只包含字符串和整数，序列化不会失败
    serde_json::to_string_pretty(nodes).unwrap_or_else(|_| "[]".to_string())
}

/// 编辑模式
pub fn edit_prompt(section_name: &str, nodes: &[BlockNode], instructions: &str) -> String {
    format!(
        r#"Here's the current "{name}" section JSON that needs to be edited:

{json}

Edit Instructions:
{instructions}

Your job is to edit the "{name}" section according to the instructions above.

CRITICAL REQUIREMENTS:
- Keep ALL content that isn't mentioned in the edit instructions - do NOT remove or change anything unless explicitly requested
- Only modify what's specifically mentioned in the edit instructions
- Preserve ALL formatting, structure, tables, headings, and JSON structure exactly as provided
- Maintain all table structures (tableRow, tableHeader, tableCell, colspan, rowspan, etc.) unless specifically asked to change them
- Do NOT remove any nodes unless explicitly requested
- If adding content, maintain the same formatting style as existing content
- If editing tables, preserve the table structure and only modify cell content

CRITICAL: Return ONLY the edited ProseMirror JSON array. The response must be VALID JSON that can be parsed directly.

{rules}"#,
        name = section_name,
        json = section_json(nodes),
        instructions = instructions.trim(),
        rules = JSON_RULES,
    )
}

/// 填充模式
///
/// `material` 是参考资料中该章节的原文，超长时截断
pub fn fill_prompt(
    section_name: &str,
    nodes: &[BlockNode],
    subject: &str,
    placeholder: &str,
    material: Option<&str>,
) -> String {
    let (reference, guidance) = match material {
        Some(text) => (
            format!(
                "Here's reference material on {subject} for the \"{name}\" section:\n\n{text}\n\n",
                subject = subject,
                name = section_name,
                text = truncate_material(text),
            ),
            format!(
                "- Use the reference material provided above as your PRIMARY source\n- Fill in any gaps or missing information using your knowledge of {}",
                subject
            ),
        ),
        None => (
            String::new(),
            format!(
                "- Generate comprehensive content based on your knowledge of {}",
                subject
            ),
        ),
    };

    format!(
        r#"Here's the JSON you need to fill out:

{json}

{reference}Your job is to fill out the "{name}" section accurately for {subject}.

{guidance}
- Fill in all placeholders (like "[…]", "[XXX words]", "PROMPT:", etc.) with actual content
- Fill out ALL tables completely - add rows with actual data, fill in all table cells
- Replace "{{{placeholder}}}" or "[{placeholder}]" with "{subject}"
- Maintain ALL formatting, structure, tables, headings, and JSON structure exactly as provided
- Preserve all table structure (tableRow, tableHeader, colspan, rowspan, etc.)
- Do NOT remove any nodes - only replace placeholder text content

CRITICAL: Return ONLY the filled ProseMirror JSON array. The response must be VALID JSON that can be parsed directly.

{rules}"#,
        json = section_json(nodes),
        reference = reference,
        name = section_name,
        subject = subject,
        guidance = guidance,
        placeholder = placeholder,
        rules = JSON_RULES,
    )
}

fn truncate_material(text: &str) -> String {
    if text.chars().count() <= MAX_MATERIAL_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_MATERIAL_CHARS).collect();
    format!("{}\n\n[... reference material truncated for length ...]", head)
}

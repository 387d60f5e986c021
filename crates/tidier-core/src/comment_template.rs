use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates supported `TemplateError` values.
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}', expected {{label}} or {{num_days}}")]
    UnknownPlaceholder { name: String },
    #[error("unterminated placeholder starting at byte {offset}")]
    UnterminatedPlaceholder { offset: usize },
    #[error("single '}}' encountered at byte {offset}")]
    UnmatchedClosingBrace { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Label,
    NumDays,
}

/// Parsed closing-comment template with `{label}` and `{num_days}` slots.
///
/// `{{` and `}}` render as literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTemplate {
    segments: Vec<Segment>,
}

impl CommentTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices().peekable();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    let mut terminated = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            terminated = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !terminated {
                        return Err(TemplateError::UnterminatedPlaceholder { offset });
                    }
                    let segment = match name.as_str() {
                        "label" => Segment::Label,
                        "num_days" => Segment::NumDays,
                        _ => return Err(TemplateError::UnknownPlaceholder { name }),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                        continue;
                    }
                    return Err(TemplateError::UnmatchedClosingBrace { offset });
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, label: &str, num_days: u64) -> String {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Label => rendered.push_str(label),
                Segment::NumDays => rendered.push_str(&num_days.to_string()),
            }
        }
        rendered
    }
}

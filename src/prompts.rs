//! Default prompts and templates.
//!
//! All four are user-overridable through the configuration file; these
//! defaults produce a sensible document with zero configuration. The
//! transcription prompt carries a literal `{context}` placeholder that is
//! substituted with the tail of the accumulated transcript before each
//! page call — it is plain string substitution, not a Tera template, so
//! users cannot accidentally break it with template syntax in their notes.

/// Per-page transcription prompt. `{context}` is replaced with the last
/// characters of the transcript accumulated from earlier pages.
pub const DEFAULT_PROMPT: &str = "\
###
Context (the last few lines of the transcription of the previous page, \
possibly empty):
{context}
###
Transcribe the handwritten notes in this image to markdown.

- Use the context above to resolve words cut off at the page boundary and \
to continue lists, headings, and numbering consistently.
- Preserve the structure of the notes: headings, bullet points, indentation.
- Use $ and $$ delimiters for inline and display math.
- Transcribe diagrams and sketches as short bracketed descriptions.
- Do NOT repeat the context. Output only the markdown for THIS page, with \
no surrounding code fences.";

/// Prompt used to transcribe a cropped handwritten title region.
pub const DEFAULT_TITLE_PROMPT: &str = "\
Transcribe the handwritten text in this image. It is a short title or \
heading. Output only the text itself: no markdown markup, no quotes, no \
commentary.";

/// Tera template for the generated Markdown document.
pub const DEFAULT_MD_TEMPLATE: &str = "\
---
created: {{ year_month_day }}
tags: notes
---

# {{ file_basename }}

{{ markdown }}

{% if keywords %}## Keywords
{% for keyword in keywords %}- Page {{ keyword.page_number + 1 }}: {{ keyword.content }}
{% endfor %}{% endif %}\
{% if links %}## Links
{% for link in links %}- Page {{ link.page_number + 1 }}: {{ link.link_type }} {{ link.direction }} {{ link.target }}
{% endfor %}{% endif %}\
{% if images %}## Pages
{% for image in images %}- ![{{ image.name }}]({{ image.rel_path }})
{% endfor %}{% endif %}";

/// Tera template for the output directory, relative to the output root.
pub const DEFAULT_OUTPUT_PATH_TEMPLATE: &str = "{{ file_basename }}";

/// Tera template for the generated document's file name.
pub const DEFAULT_OUTPUT_FILENAME_TEMPLATE: &str = "{{ file_basename }}.md";

/// Default vision model. Overridable via config or `--model`.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

use std::collections::BTreeSet;
use std::io::Write;

use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{Color, Matrix3, Transform, Vector3};
use crate::plugin::desc::PluginDesc;
use crate::plugin::schema::conform;
use crate::plugin::value::{AttrList, AttrValue, Instancer, MapChannels};
use crate::writer::format::{ExportFormat, encode_blob};

/// Serializes plugin descriptions into the textual vrscene format.
///
/// The list encoding is fixed per writer instance. Each plugin block is rendered completely in
/// memory before anything reaches the sink, so an encoding failure never leaves a partial block.
pub struct PluginWriter<W: Write> {
    name: String,
    out: W,
    format: ExportFormat,
    includes: BTreeSet<String>,
    pending_includes: Vec<String>,
    started: bool,
    frame: Option<i32>,
    plugins_written: usize,
}

impl<W: Write> PluginWriter<W> {
    /// Create a writer over `out`.
    pub fn new(name: impl Into<String>, out: W, format: ExportFormat) -> Self {
        Self {
            name: name.into(),
            out,
            format,
            includes: BTreeSet::new(),
            pending_includes: Vec::new(),
            started: false,
            frame: None,
            plugins_written: 0,
        }
    }

    /// Output name (file name for file-backed writers).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// List encoding of this writer.
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Number of plugin blocks written so far.
    pub fn plugins_written(&self) -> usize {
        self.plugins_written
    }

    /// Key subsequent values to `frame` (`interpolate((frame, value))`), or write them unkeyed.
    pub fn set_frame(&mut self, frame: Option<i32>) {
        self.frame = frame;
    }

    /// Add an `#include` directive; duplicates are ignored.
    ///
    /// Includes requested before the first plugin block are written at the top of the output.
    pub fn include(&mut self, file: &str) -> SceneportResult<()> {
        if !self.includes.insert(file.to_owned()) {
            return Ok(());
        }
        if self.started {
            writeln!(self.out, "#include \"{}\"", escape_str(file))?;
        } else {
            self.pending_includes.push(file.to_owned());
        }
        Ok(())
    }

    /// Conform `desc` to its schema and append it as one plugin block.
    pub fn write_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<()> {
        let desc = conform(desc)?;
        let text = render_plugin(&desc, self.format, self.frame)?;
        self.start()?;
        self.out.write_all(text.as_bytes())?;
        self.plugins_written += 1;
        Ok(())
    }

    /// Write pending includes and flush the sink.
    pub fn flush(&mut self) -> SceneportResult<()> {
        self.start()?;
        self.out.flush()?;
        Ok(())
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn start(&mut self) -> SceneportResult<()> {
        if self.started {
            return Ok(());
        }
        for inc in std::mem::take(&mut self.pending_includes) {
            writeln!(self.out, "#include \"{}\"", escape_str(&inc))?;
        }
        if !self.includes.is_empty() {
            writeln!(self.out)?;
        }
        self.started = true;
        Ok(())
    }
}

/// Render one plugin block.
pub fn render_plugin(
    desc: &PluginDesc,
    format: ExportFormat,
    frame: Option<i32>,
) -> SceneportResult<String> {
    let mut out = String::new();
    out.push_str(&desc.plugin_id);
    out.push(' ');
    out.push_str(&desc.name);
    out.push_str(" {\n");
    for attr in desc.attrs() {
        let value = render_value(&attr.value, format)
            .map_err(|e| in_attr(e, &desc.name, &attr.name))?;
        out.push_str("  ");
        out.push_str(&attr.name);
        out.push('=');
        match frame {
            Some(f) => {
                out.push_str("interpolate((");
                out.push_str(&f.to_string());
                out.push_str(", ");
                out.push_str(&value);
                out.push_str("))");
            }
            None => out.push_str(&value),
        }
        out.push_str(";\n");
    }
    out.push_str("}\n\n");
    Ok(out)
}

fn in_attr(e: SceneportError, plugin: &str, attr: &str) -> SceneportError {
    match e {
        SceneportError::Encoding(msg) => {
            SceneportError::encoding(format!("{plugin}.{attr}: {msg}"))
        }
        other => other,
    }
}

/// Render one attribute value in `format`.
pub fn render_value(value: &AttrValue, format: ExportFormat) -> SceneportResult<String> {
    Ok(match value {
        AttrValue::Int(v) => v.to_string(),
        AttrValue::Float(v) => fmt_float(*v)?,
        AttrValue::String(s) => quote_str(s),
        AttrValue::Color(c) => fmt_color(c)?,
        AttrValue::AColor(c) => format!(
            "AColor({}, {}, {}, {})",
            fmt_float(c.r)?,
            fmt_float(c.g)?,
            fmt_float(c.b)?,
            fmt_float(c.a)?
        ),
        AttrValue::Vector(v) => fmt_vector(v)?,
        AttrValue::Vector2(v) => format!("Vector({}, {}, 0)", fmt_float(v.x)?, fmt_float(v.y)?),
        AttrValue::Matrix(m) => fmt_matrix(m)?,
        AttrValue::Transform(t) => fmt_transform(t)?,
        AttrValue::List(list) => render_list(list, format)?,
        AttrValue::Plugin(p) => p.to_string(),
        AttrValue::MapChannels(m) => render_map_channels(m, format)?,
        AttrValue::Instancer(i) => render_instancer(i)?,
    })
}

fn render_list(list: &AttrList, format: ExportFormat) -> SceneportResult<String> {
    match list {
        AttrList::String(v) => Ok(format!(
            "List({})",
            v.iter().map(|s| quote_str(s)).collect::<Vec<_>>().join(", ")
        )),
        AttrList::Plugin(v) => Ok(format!(
            "List({})",
            v.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
        )),
        _ => {
            let Some(elem) = list.elem() else {
                return Err(SceneportError::encoding("list has no element type"));
            };
            if format == ExportFormat::Plain {
                let unpacked;
                let typed = match list {
                    AttrList::Packed(p) => {
                        unpacked = p.unpack()?;
                        &unpacked
                    }
                    other => other,
                };
                let items = plain_items(typed)?;
                return Ok(format!("{}({})", elem.list_ident(), items.join(", ")));
            }
            let bytes = list
                .to_le_bytes()?
                .ok_or_else(|| SceneportError::encoding("list has no binary form"))?;
            Ok(format!(
                "{}Hex(\"{}\")",
                elem.list_ident(),
                encode_blob(&bytes, format)?
            ))
        }
    }
}

fn plain_items(list: &AttrList) -> SceneportResult<Vec<String>> {
    match list {
        AttrList::Int(v) => Ok(v.iter().map(|i| i.to_string()).collect()),
        AttrList::Float(v) => v.iter().map(|f| fmt_float(*f)).collect(),
        AttrList::Vector(v) => v.iter().map(fmt_vector).collect(),
        AttrList::Color(v) => v.iter().map(fmt_color).collect(),
        AttrList::String(_) | AttrList::Plugin(_) | AttrList::Packed(_) => Err(
            SceneportError::encoding("list kind has no inline numeric form"),
        ),
    }
}

fn render_map_channels(m: &MapChannels, format: ExportFormat) -> SceneportResult<String> {
    let mut parts = Vec::with_capacity(m.channels.len());
    for ch in &m.channels {
        let verts = render_list(&AttrList::Vector(ch.vertices.clone()), format)?;
        let faces = render_list(&AttrList::Int(ch.faces.clone()), format)?;
        parts.push(format!("List({}, {}, {})", ch.index, verts, faces));
    }
    Ok(format!("List({})", parts.join(", ")))
}

fn render_instancer(inst: &Instancer) -> SceneportResult<String> {
    let mut out = format!("List({}", inst.frame);
    for item in &inst.items {
        out.push_str(&format!(
            ", List({}, {}, {}, {})",
            item.index,
            fmt_transform(&item.transform)?,
            fmt_transform(&item.velocity)?,
            item.node
        ));
    }
    out.push(')');
    Ok(out)
}

/// Shortest round-trip decimal form of a finite float.
pub(crate) fn fmt_float(v: f32) -> SceneportResult<String> {
    if !v.is_finite() {
        return Err(SceneportError::encoding(format!(
            "non-finite float {v} has no textual form"
        )));
    }
    Ok(v.to_string())
}

fn fmt_vector(v: &Vector3) -> SceneportResult<String> {
    Ok(format!(
        "Vector({}, {}, {})",
        fmt_float(v.x)?,
        fmt_float(v.y)?,
        fmt_float(v.z)?
    ))
}

fn fmt_color(c: &Color) -> SceneportResult<String> {
    Ok(format!(
        "Color({}, {}, {})",
        fmt_float(c.r)?,
        fmt_float(c.g)?,
        fmt_float(c.b)?
    ))
}

fn fmt_matrix(m: &Matrix3) -> SceneportResult<String> {
    Ok(format!(
        "Matrix({}, {}, {})",
        fmt_vector(&m.cols[0])?,
        fmt_vector(&m.cols[1])?,
        fmt_vector(&m.cols[2])?
    ))
}

fn fmt_transform(t: &Transform) -> SceneportResult<String> {
    Ok(format!(
        "Transform({}, {})",
        fmt_matrix(&t.matrix)?,
        fmt_vector(&t.offset)?
    ))
}

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn quote_str(s: &str) -> String {
    format!("\"{}\"", escape_str(s))
}

#[cfg(test)]
#[path = "../../tests/unit/writer/plugin_writer.rs"]
mod tests;

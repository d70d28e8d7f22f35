use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{AColor, Color, Matrix3, Transform, Vector2, Vector3};
use crate::plugin::schema::{AttrType, schema_for};
use crate::plugin::value::{
    AttrList, AttrValue, Instancer, InstancerItem, ListElem, MapChannel, MapChannels, PluginRef,
};
use crate::writer::format::decode_blob;

/// One plugin block read back from vrscene text, with raw attribute value text.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedPlugin {
    /// Renderer plugin type.
    pub plugin_id: String,
    /// Instance name.
    pub name: String,
    /// `(attribute, raw value text)` in file order.
    pub attrs: Vec<(String, String)>,
}

impl ParsedPlugin {
    /// Raw value text of an attribute.
    pub fn raw(&self, attr: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == attr)
            .map(|(_, v)| v.as_str())
    }

    /// Decode an attribute using the plugin type's schema.
    pub fn value(&self, attr: &str) -> SceneportResult<Option<AttrValue>> {
        let Some(raw) = self.raw(attr) else {
            return Ok(None);
        };
        let ty = schema_for(&self.plugin_id)
            .and_then(|s| s.attr_type(attr))
            .ok_or_else(|| {
                SceneportError::encoding(format!(
                    "{}.{attr} has no schema type to decode with",
                    self.plugin_id
                ))
            })?;
        decode_value(raw, ty).map(Some)
    }
}

/// Parse every plugin block in `text`. `#include` lines and `//` comments are skipped.
pub fn parse_plugins(text: &str) -> SceneportResult<Vec<ParsedPlugin>> {
    parse_document(text).map(|(plugins, _)| plugins)
}

/// `#include` targets in file order. Text inside plugin blocks and string values is not scanned.
pub fn parse_includes(text: &str) -> SceneportResult<Vec<String>> {
    parse_document(text).map(|(_, includes)| includes)
}

fn parse_document(text: &str) -> SceneportResult<(Vec<ParsedPlugin>, Vec<String>)> {
    let mut cur = Cursor {
        s: text,
        pos: 0,
        includes: Vec::new(),
    };
    let mut out = Vec::new();
    loop {
        cur.skip_trivia();
        if cur.at_end() {
            return Ok((out, cur.includes));
        }
        let plugin_id = cur.ident()?;
        cur.skip_trivia();
        let name = cur.ident()?;
        cur.skip_trivia();
        cur.expect('{')?;

        let mut attrs = Vec::new();
        loop {
            cur.skip_trivia();
            if cur.eat('}') {
                break;
            }
            let attr = cur.ident()?;
            cur.skip_trivia();
            cur.expect('=')?;
            let value = cur.until_semicolon()?;
            attrs.push((attr.to_owned(), value.trim().to_owned()));
        }
        out.push(ParsedPlugin {
            plugin_id: plugin_id.to_owned(),
            name: name.to_owned(),
            attrs,
        });
    }
}

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
    includes: Vec<String>,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with('#') || trimmed.starts_with("//") {
                let len = trimmed.find('\n').unwrap_or(trimmed.len());
                if let Some(target) = trimmed[..len].strip_prefix("#include")
                    && let Ok(path) = unquote(target)
                {
                    self.includes.push(path);
                }
                self.pos += len;
            } else {
                return;
            }
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> SceneportResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn ident(&mut self) -> SceneportResult<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '|' | ':')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn until_semicolon(&mut self) -> SceneportResult<&'a str> {
        let rest = self.rest();
        let mut depth = 0i32;
        let mut in_str = false;
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            if in_str {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_str = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_str = true,
                '(' => depth += 1,
                ')' => depth -= 1,
                ';' if depth == 0 => {
                    self.pos += i + 1;
                    return Ok(&rest[..i]);
                }
                _ => {}
            }
        }
        Err(self.error("unterminated attribute value"))
    }

    fn error(&self, msg: &str) -> SceneportError {
        let line = self.s[..self.pos].matches('\n').count() + 1;
        SceneportError::encoding(format!("vrscene parse error at line {line}: {msg}"))
    }
}

/// Strip an `interpolate((frame, value))` wrapper, returning the key frame if present.
pub fn strip_keyed(raw: &str) -> SceneportResult<(Option<i32>, &str)> {
    let raw = raw.trim();
    let Some(inner) = raw
        .strip_prefix("interpolate((")
        .and_then(|r| r.strip_suffix("))"))
    else {
        return Ok((None, raw));
    };
    let (frame, value) = inner
        .split_once(',')
        .ok_or_else(|| SceneportError::encoding("interpolate() without a value"))?;
    let frame = frame
        .trim()
        .parse::<i32>()
        .map_err(|e| SceneportError::encoding(format!("bad interpolate frame: {e}")))?;
    Ok((Some(frame), value.trim()))
}

/// Decode value text written for an attribute of type `ty`.
pub fn decode_value(raw: &str, ty: AttrType) -> SceneportResult<AttrValue> {
    let (_, raw) = strip_keyed(raw)?;
    Ok(match ty {
        AttrType::Int => AttrValue::Int(int(raw)?),
        AttrType::Float => AttrValue::Float(float(raw)?),
        AttrType::String => AttrValue::String(unquote(raw)?),
        AttrType::Color => AttrValue::Color(color(raw)?),
        AttrType::AColor => {
            let a = floats_call(raw, "AColor", 4)?;
            AttrValue::AColor(AColor {
                r: a[0],
                g: a[1],
                b: a[2],
                a: a[3],
            })
        }
        AttrType::Vector => AttrValue::Vector(vector(raw)?),
        AttrType::Vector2 => {
            let v = vector(raw)?;
            AttrValue::Vector2(Vector2 { x: v.x, y: v.y })
        }
        AttrType::Matrix => AttrValue::Matrix(matrix(raw)?),
        AttrType::Transform => AttrValue::Transform(transform(raw)?),
        AttrType::Plugin => AttrValue::Plugin(plugin_ref(raw)?),
        AttrType::ListInt => AttrValue::List(typed_list(raw, ListElem::Int)?),
        AttrType::ListFloat => AttrValue::List(typed_list(raw, ListElem::Float)?),
        AttrType::ListVector => AttrValue::List(typed_list(raw, ListElem::Vector)?),
        AttrType::ListColor => AttrValue::List(typed_list(raw, ListElem::Color)?),
        AttrType::ListString => AttrValue::List(AttrList::String(
            call(raw, "List")?
                .into_iter()
                .map(unquote)
                .collect::<SceneportResult<_>>()?,
        )),
        AttrType::ListPlugin => AttrValue::List(AttrList::Plugin(
            call(raw, "List")?
                .into_iter()
                .map(plugin_ref)
                .collect::<SceneportResult<_>>()?,
        )),
        AttrType::MapChannels => AttrValue::MapChannels(map_channels(raw)?),
        AttrType::Instancer => AttrValue::Instancer(instancer(raw)?),
    })
}

fn int(s: &str) -> SceneportResult<i32> {
    s.trim()
        .parse()
        .map_err(|e| SceneportError::encoding(format!("bad integer '{s}': {e}")))
}

fn float(s: &str) -> SceneportResult<f32> {
    s.trim()
        .parse()
        .map_err(|e| SceneportError::encoding(format!("bad float '{s}': {e}")))
}

fn unquote(s: &str) -> SceneportResult<String> {
    let inner = s
        .trim()
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| SceneportError::encoding(format!("expected quoted string, got '{s}'")))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) => out.push(n),
                None => return Err(SceneportError::encoding("dangling escape in string")),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn plugin_ref(s: &str) -> SceneportResult<PluginRef> {
    let s = s.trim();
    if s.is_empty() {
        return Err(SceneportError::encoding("empty plugin reference"));
    }
    Ok(match s.split_once("::") {
        Some((name, out)) => PluginRef::with_output(name, out),
        None => PluginRef::new(s),
    })
}

/// Split `Ident(a, b, ...)` into its identifier and top-level arguments.
fn split_call(s: &str) -> SceneportResult<(&str, Vec<&str>)> {
    let s = s.trim();
    let open = s
        .find('(')
        .ok_or_else(|| SceneportError::encoding(format!("expected call, got '{s}'")))?;
    let inner = s[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| SceneportError::encoding(format!("unbalanced call '{s}'")))?;
    Ok((s[..open].trim(), split_args(inner)))
}

fn call<'a>(s: &'a str, ident: &str) -> SceneportResult<Vec<&'a str>> {
    let (got, args) = split_call(s)?;
    if got != ident {
        return Err(SceneportError::encoding(format!(
            "expected {ident}(...), got {got}(...)"
        )));
    }
    Ok(args)
}

fn split_args(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_str = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                out.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(inner[start..].trim());
    out
}

fn floats_call(s: &str, ident: &str, n: usize) -> SceneportResult<Vec<f32>> {
    let args = call(s, ident)?;
    if args.len() != n {
        return Err(SceneportError::encoding(format!(
            "{ident} expects {n} components, got {}",
            args.len()
        )));
    }
    args.into_iter().map(float).collect()
}

fn vector(s: &str) -> SceneportResult<Vector3> {
    let v = floats_call(s, "Vector", 3)?;
    Ok(Vector3::new(v[0], v[1], v[2]))
}

fn color(s: &str) -> SceneportResult<Color> {
    let v = floats_call(s, "Color", 3)?;
    Ok(Color::from([v[0], v[1], v[2]]))
}

fn matrix(s: &str) -> SceneportResult<Matrix3> {
    let args = call(s, "Matrix")?;
    if args.len() != 3 {
        return Err(SceneportError::encoding("Matrix expects 3 columns"));
    }
    Ok(Matrix3 {
        cols: [vector(args[0])?, vector(args[1])?, vector(args[2])?],
    })
}

fn transform(s: &str) -> SceneportResult<Transform> {
    let args = call(s, "Transform")?;
    if args.len() != 2 {
        return Err(SceneportError::encoding("Transform expects matrix and offset"));
    }
    Ok(Transform {
        matrix: matrix(args[0])?,
        offset: vector(args[1])?,
    })
}

fn typed_list(s: &str, elem: ListElem) -> SceneportResult<AttrList> {
    let (ident, args) = split_call(s)?;
    if let Some(base) = ident.strip_suffix("Hex") {
        if ListElem::from_list_ident(base) != Some(elem) || args.len() != 1 {
            return Err(SceneportError::encoding(format!(
                "expected {}Hex(\"..\"), got {ident}(...)",
                elem.list_ident()
            )));
        }
        let bytes = decode_blob(&unquote(args[0])?)?;
        return AttrList::from_le_bytes(elem, &bytes);
    }
    if ListElem::from_list_ident(ident) != Some(elem) {
        return Err(SceneportError::encoding(format!(
            "expected {}(...), got {ident}(...)",
            elem.list_ident()
        )));
    }
    Ok(match elem {
        ListElem::Int => AttrList::Int(args.into_iter().map(int).collect::<SceneportResult<_>>()?),
        ListElem::Float => {
            AttrList::Float(args.into_iter().map(float).collect::<SceneportResult<_>>()?)
        }
        ListElem::Vector => {
            AttrList::Vector(args.into_iter().map(vector).collect::<SceneportResult<_>>()?)
        }
        ListElem::Color => {
            AttrList::Color(args.into_iter().map(color).collect::<SceneportResult<_>>()?)
        }
    })
}

fn map_channels(s: &str) -> SceneportResult<MapChannels> {
    let mut channels = Vec::new();
    for ch in call(s, "List")? {
        let parts = call(ch, "List")?;
        if parts.len() != 3 {
            return Err(SceneportError::encoding(
                "map channel expects index, vertices, faces",
            ));
        }
        let AttrList::Vector(vertices) = typed_list(parts[1], ListElem::Vector)? else {
            return Err(SceneportError::encoding("map channel vertices"));
        };
        let AttrList::Int(faces) = typed_list(parts[2], ListElem::Int)? else {
            return Err(SceneportError::encoding("map channel faces"));
        };
        channels.push(MapChannel {
            index: int(parts[0])?,
            vertices,
            faces,
        });
    }
    Ok(MapChannels { channels })
}

fn instancer(s: &str) -> SceneportResult<Instancer> {
    let args = call(s, "List")?;
    let (frame, items) = args
        .split_first()
        .ok_or_else(|| SceneportError::encoding("instancer without a frame"))?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let parts = call(item, "List")?;
        if parts.len() != 4 {
            return Err(SceneportError::encoding(
                "instancer item expects index, transform, velocity, node",
            ));
        }
        out.push(InstancerItem {
            index: int(parts[0])?,
            transform: transform(parts[1])?,
            velocity: transform(parts[2])?,
            node: plugin_ref(parts[3])?,
        });
    }
    Ok(Instancer {
        frame: int(frame)?,
        items: out,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/writer/decode.rs"]
mod tests;

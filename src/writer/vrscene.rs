use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;

use crate::export::PluginExporter;
use crate::foundation::error::SceneportResult;
use crate::plugin::desc::{PluginCategory, PluginDesc};
use crate::plugin::value::PluginRef;
use crate::writer::format::ExportFormat;
use crate::writer::plugin_writer::PluginWriter;

/// Opens named vrscene outputs.
pub trait OutputFactory: Send {
    /// Output handle type.
    type Out: Write + Send;
    /// Open (create or truncate) the output `file_name`.
    fn open(&mut self, file_name: &str) -> SceneportResult<Self::Out>;
}

/// Outputs created as files inside one directory.
#[derive(Clone, Debug)]
pub struct FileOutputs {
    dir: PathBuf,
}

impl FileOutputs {
    /// Write outputs into `dir` (created on first open).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputFactory for FileOutputs {
    type Out = BufWriter<std::fs::File>;

    fn open(&mut self, file_name: &str) -> SceneportResult<Self::Out> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        let path = self.dir.join(file_name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create '{}'", path.display()))?;
        Ok(BufWriter::new(file))
    }
}

/// In-memory outputs for tests and debugging; buffers stay readable through clones.
#[derive(Clone, Debug, Default)]
pub struct MemoryOutputs {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryOutputs {
    /// Create an empty output set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of opened outputs in sorted order.
    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Text written to `file_name` so far.
    pub fn contents(&self, file_name: &str) -> Option<String> {
        self.files
            .lock()
            .get(file_name)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// Handle to one in-memory output.
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.files
            .lock()
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl OutputFactory for MemoryOutputs {
    type Out = MemoryFile;

    fn open(&mut self, file_name: &str) -> SceneportResult<Self::Out> {
        self.files.lock().insert(file_name.to_owned(), Vec::new());
        Ok(MemoryFile {
            name: file_name.to_owned(),
            files: Arc::clone(&self.files),
        })
    }
}

/// Options for [`VrsceneExporter`].
#[derive(Clone, Debug)]
pub struct VrsceneOpts {
    /// Base file name without extension.
    pub base_name: String,
    /// List encoding of every writer.
    pub format: ExportFormat,
    /// Partition plugins by category into `<base>_<suffix>.vrscene` files.
    pub split: bool,
}

impl VrsceneOpts {
    /// Single-file options for `base_name` with the default encoding.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            format: ExportFormat::default(),
            split: false,
        }
    }

    /// Name of the base file.
    pub fn main_file(&self) -> String {
        format!("{}.vrscene", self.base_name)
    }

    /// Name of the partition file for `category`.
    pub fn part_file(&self, category: PluginCategory) -> String {
        format!("{}_{}.vrscene", self.base_name, category.partition_suffix())
    }
}

/// Plugin exporter writing vrscene text, optionally split across partition files.
///
/// The base file is opened on construction. Partition files are opened on their first plugin,
/// which also adds their `#include` to the base file, so empty partitions never exist.
pub struct VrsceneExporter<F: OutputFactory> {
    opts: VrsceneOpts,
    factory: F,
    main: PluginWriter<F::Out>,
    parts: BTreeMap<PluginCategory, PluginWriter<F::Out>>,
    frame: Option<i32>,
}

impl<F: OutputFactory> VrsceneExporter<F> {
    /// Open the base output.
    pub fn new(opts: VrsceneOpts, mut factory: F) -> SceneportResult<Self> {
        let main_name = opts.main_file();
        let out = factory.open(&main_name)?;
        tracing::debug!(file = %main_name, format = ?opts.format, split = opts.split, "vrscene opened");
        Ok(Self {
            main: PluginWriter::new(main_name, out, opts.format),
            opts,
            factory,
            parts: BTreeMap::new(),
            frame: None,
        })
    }

    /// Exporter options.
    pub fn opts(&self) -> &VrsceneOpts {
        &self.opts
    }

    /// Number of plugin blocks written across all outputs.
    pub fn plugins_written(&self) -> usize {
        self.main.plugins_written()
            + self
                .parts
                .values()
                .map(PluginWriter::plugins_written)
                .sum::<usize>()
    }

    fn writer_for(&mut self, category: PluginCategory) -> SceneportResult<&mut PluginWriter<F::Out>> {
        if !self.opts.split {
            return Ok(&mut self.main);
        }
        match self.parts.entry(category) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let name = self.opts.part_file(category);
                let out = self.factory.open(&name)?;
                let mut w = PluginWriter::new(name.clone(), out, self.opts.format);
                w.set_frame(self.frame);
                self.main.include(&name)?;
                tracing::debug!(file = %name, "vrscene partition opened");
                Ok(e.insert(w))
            }
        }
    }
}

impl<F: OutputFactory> PluginExporter for VrsceneExporter<F> {
    fn export_plugin(&mut self, desc: &PluginDesc) -> SceneportResult<PluginRef> {
        self.writer_for(desc.category)?.write_plugin(desc)?;
        Ok(desc.plugin_ref())
    }

    fn set_current_frame(&mut self, frame: Option<i32>) -> SceneportResult<()> {
        self.frame = frame;
        self.main.set_frame(frame);
        for w in self.parts.values_mut() {
            w.set_frame(frame);
        }
        Ok(())
    }

    fn flush(&mut self) -> SceneportResult<()> {
        self.main.flush()?;
        for w in self.parts.values_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/writer/vrscene.rs"]
mod tests;

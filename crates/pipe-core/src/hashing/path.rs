//! Fingerprint de contenido para datos externos (archivo o árbol de archivos).
//!
//! Se recorre el árbol en orden lexicográfico y se hashean ruta relativa y
//! bytes de cada archivo regular. Metadatos del filesystem (mtime, permisos)
//! no participan: el mismo contenido copiado a otro lado produce el mismo
//! fingerprint.

use std::fs::File;
use std::io;
use std::path::Path;

use blake3::Hasher;
use walkdir::WalkDir;

pub fn fingerprint_path(root: &Path) -> io::Result<String> {
    let mut hasher = Hasher::new();
    if root.is_file() {
        let mut file = File::open(root)?;
        io::copy(&mut file, &mut hasher)?;
        return Ok(hasher.finalize().to_hex().to_string());
    }
    if !root.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, format!("external source not found: {}", root.display())));
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        let mut file = File::open(entry.path())?;
        io::copy(&mut file, &mut hasher)?;
        hasher.update(&[0]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

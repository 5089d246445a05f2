use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Obj,
    /// JSON and binary glTF alike.
    Gltf,
    /// A zip inside of the uploaded archive.
    CompositeArchive,
    Scan,
    WallTrace,
    MaterialLibrary,
    Unknown,
}

impl ModelKind {
    /// Renderable kinds, as opposed to auxiliary files that only exist to be referenced.
    pub fn is_visual(&self) -> bool {
        match self {
            ModelKind::Obj | ModelKind::Gltf | ModelKind::CompositeArchive | ModelKind::Scan | ModelKind::WallTrace => {
                true
            }
            ModelKind::MaterialLibrary | ModelKind::Unknown => false,
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Obj => "obj",
            ModelKind::Gltf => "gltf",
            ModelKind::CompositeArchive => "archive",
            ModelKind::Scan => "scan",
            ModelKind::WallTrace => "wall-trace",
            ModelKind::MaterialLibrary => "material-library",
            ModelKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

const MEDIA_TYPES: [(&str, ModelKind); 9] = [
    ("model/obj", ModelKind::Obj),
    ("model/gltf+json", ModelKind::Gltf),
    ("model/gltf-binary", ModelKind::Gltf),
    ("application/zip", ModelKind::CompositeArchive),
    ("application/x-zip-compressed", ModelKind::CompositeArchive),
    ("application/x-cavernseer-scan", ModelKind::Scan),
    ("application/x-cavernseer-walltrace", ModelKind::WallTrace),
    ("model/mtl", ModelKind::MaterialLibrary),
    ("application/x-tgif", ModelKind::MaterialLibrary), // what some browsers report for .mtl
];

const EXTENSIONS: [(&str, ModelKind); 7] = [
    ("obj", ModelKind::Obj),
    ("gltf", ModelKind::Gltf),
    ("glb", ModelKind::Gltf),
    ("zip", ModelKind::CompositeArchive),
    ("cavernseerscan", ModelKind::Scan),
    ("walltrace", ModelKind::WallTrace),
    ("mtl", ModelKind::MaterialLibrary),
];

/// Classifies by media type first, then by the file extension. Never fails, everything
/// unrecognized is [`ModelKind::Unknown`].
pub fn classify(media_type: Option<&str>, file_name: &str) -> ModelKind {
    if let Some(media_type) = media_type {
        // ignore parameters like `; charset=utf-8`
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        if let Some((_, kind)) = MEDIA_TYPES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(essence))
        {
            return *kind;
        }
    }

    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return ModelKind::Unknown;
    };

    EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map(|(_, kind)| *kind)
        .unwrap_or(ModelKind::Unknown)
}

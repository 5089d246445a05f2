#[derive(Debug, Clone, PartialEq)]
pub struct MtlMaterial {
    pub name: String,
    /// `Ka`
    pub ambient: Option<[f32; 3]>,
    /// `Kd`
    pub diffuse: Option<[f32; 3]>,
    /// `Ks`
    pub specular: Option<[f32; 3]>,
    /// `Ns`
    pub shininess: Option<f32>,
    /// `d`, or `1 - Tr`
    pub dissolve: Option<f32>,
    /// `map_Kd`, relative to the MTL file.
    pub diffuse_map: Option<String>,
}

impl MtlMaterial {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ambient: None,
            diffuse: None,
            specular: None,
            shininess: None,
            dissolve: None,
            diffuse_map: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MtlAsset {
    pub materials: Vec<MtlMaterial>,
}

impl MtlAsset {
    pub fn material(&self, name: &str) -> Option<&MtlMaterial> {
        self.materials.iter().find(|material| material.name == name)
    }
}

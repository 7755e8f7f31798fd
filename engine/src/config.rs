use std::path::PathBuf;

pub const WINDOW_WIDTH: u32 = 720;
pub const WINDOW_HEIGHT: u32 = 560;

/// Compile-time settings for the window and the triangle pipeline.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub application_name: &'static [u8],
    pub engine_name: &'static [u8],
    pub shader_dir: PathBuf,
}

impl EngineConfig {
    pub fn vertex_shader_path(&self) -> PathBuf {
        self.shader_dir.join("vert.spv")
    }

    pub fn fragment_shader_path(&self) -> PathBuf {
        self.shader_dir.join("frag.spv")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Vulkan"),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            application_name: b"Hello Triangle\0",
            engine_name: b"No Engine\0",
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

// Models offered to the UI. The provider accepts any model id; this list is only
// what the model picker shows.

use serde::Serialize;

pub const GPT_OSS_20B: &str = "gpt-oss-20b";
pub const DEEPSEEK_V3_1: &str = "deepseek/deepseek-chat-v3.1";
pub const GLM_4_5_AIR: &str = "zhipuai/glm-4.5-air";
pub const KIMI_K2_0711: &str = "moonshot/kimi-k2-0711";
/// Uncensored model used for roast mode. Selecting it switches persona.
pub const ROAST_MODEL: &str = "cognitivecomputations/dolphin-mistral-24b-venice-edition:free";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODEL_INFO: &[ModelInfo] = &[
    ModelInfo {
        id: GPT_OSS_20B,
        name: "GPT OSS 20B",
        description: "Open source model",
    },
    ModelInfo {
        id: DEEPSEEK_V3_1,
        name: "DeepSeek v3.1",
        description: "Advanced reasoning model",
    },
    ModelInfo {
        id: GLM_4_5_AIR,
        name: "GLM 4.5 Air",
        description: "Lightweight & efficient",
    },
    ModelInfo {
        id: KIMI_K2_0711,
        name: "Kimi K2",
        description: "Long context model",
    },
    ModelInfo {
        id: ROAST_MODEL,
        name: "Roast Mode",
        description: "Brutally honest resume critique",
    },
];

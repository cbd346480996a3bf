//! Promoreel Render Engine
//!
//! Turns a render job (media, template, optional voiceover, title text)
//! into a fully-timed render plan and drives ffmpeg to produce the final
//! promotional video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! job options ──► Asset Resolver ──► Timing Planner
//!                                          │
//!                     template grade ──────┤
//!                                          ▼
//!                                 Scene Graph (scale/crop/grade/zoompan, xfade)
//!                                          │
//!                                          ▼
//!                                 End Card (blur, dim, text) ── concat
//!                                          │
//!            music / voiceover ──► Audio Mix (trim, fade, amix)
//!                                          │
//!                     logo / title ──► Branding (overlay, caption)
//!                                          │
//!                                          ▼
//!                                   Emitter (ffmpeg)
//!                                          │
//!                                          ▼
//!                              video_<job>.mp4 + poster .jpg
//! ```
//!
//! Every stage appends to a typed [`graph::FilterGraph`]; only the emitter
//! turns it into ffmpeg syntax.

pub mod assets;
pub mod audio;
pub mod branding;
pub mod emitter;
pub mod encoder;
pub mod end_card;
pub mod graph;
pub mod pipeline;
pub mod plan;
pub mod scene_graph;
pub mod stale;
pub mod text;
pub mod timing;
pub mod worker;

pub use assets::{AssetResolver, AssetStore, LocalAssetStore, MediaAsset, ResolvedAssets};
pub use emitter::{EmitOutcome, Emitter};
pub use encoder::{
    EncoderBackend, EncoderOutput, FfmpegBackend, ProgressCallback, RenderProgress, RenderStage,
};
pub use pipeline::{PreparedJob, ReelPipeline};
pub use plan::{compose_plan, PlanInputs, RenderPlan};
pub use stale::{detect_stale_jobs, StaleJob};
pub use timing::TimingPlan;
pub use worker::{JobHandle, RenderQueue};

mod common;

use common::{FakeEncoder, Fixture};
use proptest::prelude::*;
use promoreel_job_model::{RenderOptions, TemplateRegistry};
use promoreel_render_engine::assets::{AssetResolver, LocalAssetStore, MAX_ASSETS};
use promoreel_render_engine::timing::{TimingPlan, END_CARD_SECS, MIN_SCENE_SECS};

const EPSILON: f64 = 1e-9;

proptest! {
    #[test]
    fn tempo_sets_scene_length(bpm in 1.0f64..300.0, scenes in 1usize..=15) {
        let mut template = TemplateRegistry::builtin().default_template().clone();
        template.bpm = bpm;
        let plan = TimingPlan::compute(&template, scenes, None);
        prop_assert!((plan.per_scene_secs - (60.0 / bpm) * 4.0).abs() < EPSILON);
    }

    #[test]
    fn voiceover_sets_floored_scene_length(voice in 0.01f64..600.0, scenes in 1usize..=15) {
        let template = TemplateRegistry::builtin().default_template().clone();
        let plan = TimingPlan::compute(&template, scenes, Some(voice));
        let expected = (voice / scenes as f64).max(MIN_SCENE_SECS);
        prop_assert!((plan.per_scene_secs - expected).abs() < EPSILON);
        prop_assert!(plan.per_scene_secs >= MIN_SCENE_SECS);
    }

    #[test]
    fn total_is_scenes_plus_end_card(
        bpm in -50.0f64..300.0,
        voice in proptest::option::of(0.0f64..120.0),
        scenes in 1usize..=15,
    ) {
        let mut template = TemplateRegistry::builtin().default_template().clone();
        template.bpm = bpm;
        let plan = TimingPlan::compute(&template, scenes, voice);
        let expected = scenes as f64 * plan.per_scene_secs + END_CARD_SECS;
        prop_assert!((plan.total_secs() - expected).abs() < 1e-6);
        prop_assert!(plan.per_scene_secs > 0.0);
    }

    #[test]
    fn plan_total_matches_scene_sum(scenes in 1usize..=15, template_index in 0usize..4) {
        let fx = Fixture::new(|_| FakeEncoder::available());
        let ids = ["luxury", "party", "family", "reels"];
        let job = promoreel_job_model::RenderJob::new(
            ids[template_index],
            RenderOptions {
                media_paths: Fixture::media_paths(scenes),
                ..Default::default()
            },
        );
        let plan = fx.pipeline.plan_job(&job).unwrap().remove(0);
        let sum: f64 = plan.scenes.iter().map(|s| s.duration_secs).sum();
        prop_assert_eq!(sum + plan.end_card.duration_secs, plan.total_duration_secs);
        prop_assert_eq!(plan.audio.total_secs, plan.total_duration_secs);
    }

    #[test]
    fn resolved_asset_count_stays_in_range(
        paths in 0usize..40,
        max_assets in 0usize..40,
        fallback in 0usize..20,
        encoder_present in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = promoreel_common::AppConfig::rooted_at(dir.path());
        config.render.max_assets = max_assets;
        config.render.fallback_asset_count = fallback;
        let encoder = if encoder_present {
            FakeEncoder::available()
        } else {
            FakeEncoder::missing()
        };
        let store = LocalAssetStore::default();
        let resolver = AssetResolver::new(&config, &store, &encoder);

        let options = RenderOptions {
            media_paths: Fixture::media_paths(paths),
            ..Default::default()
        };
        let resolved = resolver.resolve(&options).unwrap();
        prop_assert!(!resolved.assets.is_empty());
        prop_assert!(resolved.assets.len() <= MAX_ASSETS);
    }
}

use crate::catalog::StimulusCatalog;
use crate::config::{ExperimentConfig, PlanStrategy, StimulusFolder};
use crate::error::ExperimentError;
use catex_core::{AssetRef, Category, Trial};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::info;

type Pool = Vec<(Category, Vec<AssetRef>)>;

fn list_all<C>(catalog: &C, folders: &[StimulusFolder]) -> Result<Pool, ExperimentError>
where
    C: StimulusCatalog + ?Sized,
{
    folders
        .iter()
        .map(|f| Ok((f.category.clone(), catalog.list_assets(&f.category)?)))
        .collect()
}

fn draw<R: Rng + ?Sized>(
    pool: &Pool,
    rng: &mut R,
) -> Result<(Category, AssetRef), ExperimentError> {
    let (category, assets) = pool
        .choose(rng)
        .ok_or_else(|| ExperimentError::Config("no categories to sample from".into()))?;
    let asset = assets
        .choose(rng)
        .ok_or_else(|| ExperimentError::MissingAsset {
            category: category.to_string(),
            folder: Default::default(),
        })?;
    Ok((category.clone(), asset.clone()))
}

/// Builds the fixed trial sequence for a session.
///
/// Every configured category is listed before anything is drawn, so an
/// absent or empty folder aborts here and no trial ever runs.
pub fn build_plan<C, R>(
    config: &ExperimentConfig,
    catalog: &C,
    rng: &mut R,
) -> Result<Vec<Trial>, ExperimentError>
where
    C: StimulusCatalog + ?Sized,
    R: Rng + ?Sized,
{
    let targets = list_all(catalog, &config.targets)?;
    let distractors = list_all(catalog, &config.distractors)?;

    let mut trials = match config.plan {
        PlanStrategy::Catalog { limit } => {
            let mut flat: Vec<AssetRef> = targets.into_iter().flat_map(|(_, a)| a).collect();
            flat.shuffle(rng);
            if let Some(limit) = limit {
                flat.truncate(limit);
            }
            flat.into_iter()
                .map(|stimulus| Trial {
                    id: 0,
                    category: stimulus.category.clone(),
                    distractor_category: None,
                    stimulus,
                    distractor: None,
                })
                .collect::<Vec<_>>()
        }
        PlanStrategy::Sampled { trials } => {
            let mut planned = Vec::with_capacity(trials);
            for _ in 0..trials {
                let (category, stimulus) = draw(&targets, rng)?;
                let (distractor_category, distractor) = if distractors.is_empty() {
                    (None, None)
                } else {
                    let (c, a) = draw(&distractors, rng)?;
                    (Some(c), Some(a))
                };
                planned.push(Trial {
                    id: 0,
                    category,
                    distractor_category,
                    stimulus,
                    distractor,
                });
            }
            planned.shuffle(rng);
            planned
        }
    };

    for (id, trial) in trials.iter_mut().enumerate() {
        trial.id = id;
    }
    info!(trials = trials.len(), strategy = ?config.plan, "built trial plan");
    Ok(trials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StimulusFolder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};

    /// In-memory catalog: category name → number of images.
    struct FakeCatalog(HashMap<&'static str, usize>);

    impl StimulusCatalog for FakeCatalog {
        fn list_assets(&self, category: &Category) -> Result<Vec<AssetRef>, ExperimentError> {
            match self.0.get(category.as_str()) {
                Some(&n) if n > 0 => Ok((0..n)
                    .map(|i| AssetRef::new(category.clone(), format!("{category}/{i}.png")))
                    .collect()),
                _ => Err(ExperimentError::MissingAsset {
                    category: category.to_string(),
                    folder: category.as_str().into(),
                }),
            }
        }
    }

    fn emotion_catalog(angry: usize) -> FakeCatalog {
        FakeCatalog(HashMap::from([("happy", 4), ("neutral", 3), ("angry", angry)]))
    }

    #[test]
    fn catalog_plan_uses_each_image_once() {
        let mut config = ExperimentConfig::emotion();
        config.plan = PlanStrategy::Catalog { limit: None };
        let plan = build_plan(&config, &emotion_catalog(2), &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(plan.len(), 9);
        let unique: HashSet<_> = plan.iter().map(|t| t.stimulus.path.clone()).collect();
        assert_eq!(unique.len(), 9);
        assert!(plan.iter().all(|t| t.category == t.stimulus.category));
        assert!(plan.iter().all(|t| t.distractor.is_none()));
        assert_eq!(plan.iter().map(|t| t.id).collect::<Vec<_>>(), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn catalog_plan_respects_limit() {
        let mut config = ExperimentConfig::emotion();
        config.plan = PlanStrategy::Catalog { limit: Some(5) };
        let plan = build_plan(&config, &emotion_catalog(2), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn sampled_plan_draws_fixed_count_with_distractors() {
        let mut config = ExperimentConfig::flanker();
        config.plan = PlanStrategy::Sampled { trials: 40 };
        config.targets = vec![
            StimulusFolder::new("circle", "c"),
            StimulusFolder::new("square", "s"),
        ];
        config.distractors = vec![StimulusFolder::new("happy", "h")];
        let catalog = FakeCatalog(HashMap::from([("circle", 1), ("square", 2), ("happy", 3)]));

        let plan = build_plan(&config, &catalog, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(plan.len(), 40);
        for t in &plan {
            assert!(t.category.as_str() == "circle" || t.category.as_str() == "square");
            assert_eq!(t.distractor_category.as_ref().map(Category::as_str), Some("happy"));
            assert_eq!(t.distractor.as_ref().map(|d| &d.category), t.distractor_category.as_ref());
        }
    }

    #[test]
    fn same_seed_same_plan() {
        let config = ExperimentConfig::emotion();
        let a = build_plan(&config, &emotion_catalog(3), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = build_plan(&config, &emotion_catalog(3), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_category_aborts_before_any_trial() {
        let config = ExperimentConfig::emotion();
        let err =
            build_plan(&config, &emotion_catalog(0), &mut StdRng::seed_from_u64(0)).unwrap_err();
        match err {
            ExperimentError::MissingAsset { category, .. } => assert_eq!(category, "angry"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

use super::*;
use crate::component::{Callbacks, OptionSpec, ValueKind};

/// Environment that records every callback in call order.
#[derive(Debug, Default)]
struct Journal
{
        events: Vec<String>,
        fail_activation: Vec<String>,
}

impl Journal
{
        fn take(&mut self) -> Vec<String>
        {
                std::mem::take(&mut self.events)
        }
}

fn recording() -> Callbacks<Journal>
{
        Callbacks::new(|ctx: &mut ActivationContext<'_, Journal>| {
                let key = ctx.component().key().to_string();

                if ctx.env.fail_activation.contains(&key)
                {
                        anyhow::bail!("refusing to activate {key}");
                }

                ctx.env.events.push(format!("activate {key}"));

                Ok(Box::new(key))
        })
        .on_deactivate(|component, _, env: &mut Journal| {
                env.events.push(format!("deactivate {}", component.key()));
        })
}

fn chain_view() -> View<Journal>
{
        let mut view = View::default();

        view.register_type(ComponentType::new("c", recording()))
                .unwrap();

        view.register_type(
                ComponentType::new("b", recording()).option(OptionSpec::dependency("c", "c")),
        )
        .unwrap();

        view.register_type(
                ComponentType::new("a", recording()).option(OptionSpec::dependency("b", "b")),
        )
        .unwrap();

        view
}

fn add_chain(view: &mut View<Journal>) -> (ComponentKey, ComponentKey, ComponentKey)
{
        let a = view
                .add_component(1, "a", [("b", OptionValue::Entity(EntityId(2)))])
                .unwrap();

        let b = view
                .add_component(2, "b", [("c", OptionValue::Entity(EntityId(3)))])
                .unwrap();

        let c = view
                .add_component(3, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        (a, b, c)
}

#[test_log::test]
fn activation_runs_bottom_up()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let (a, b, c) = add_chain(&mut view);

        view.try_activate(&a, &mut journal).unwrap();

        assert_eq!(journal.take(), vec!["activate c@#3", "activate b@#2", "activate a@#1"]);

        for key in [&a, &b, &c]
        {
                assert_eq!(view.state(key), Some(ActivationState::Active));
        }

        assert_eq!(view.component(&a).unwrap().resolved_dependency("b"), Some(&b));
}

#[test_log::test]
fn removal_deactivates_dependents_first()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let (a, b, _) = add_chain(&mut view);

        view.try_activate(&a, &mut journal).unwrap();
        journal.take();

        assert!(view.remove_component(3, "c", &mut journal));

        assert_eq!(journal.take(), vec!["deactivate a@#1", "deactivate b@#2", "deactivate c@#3"]);

        assert_eq!(view.state(&a), Some(ActivationState::Inactive));
        assert_eq!(view.state(&b), Some(ActivationState::Inactive));
        assert!(view.component(&b).unwrap().resolved_dependency("c").is_none());
        assert!(view.get(EntityId(3), "c").is_none());
}

#[test]
fn removal_is_idempotent()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        add_chain(&mut view);

        assert!(view.remove_component(3, "c", &mut journal));
        assert!(!view.remove_component(3, "c", &mut journal));
        assert!(!view.remove_component(42, "c", &mut journal));
        assert!(journal.events.is_empty());
}

#[test]
fn missing_target_entity_is_unsatisfied()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let b = view
                .add_component(2, "b", [("c", OptionValue::Entity(EntityId(99)))])
                .unwrap();

        let err = view.try_activate(&b, &mut journal).unwrap_err();

        assert!(matches!(err, ComponentError::UnsatisfiedDependency { ref option, .. } if option == "c"));
        assert_eq!(view.state(&b), Some(ActivationState::Inactive));
        assert!(journal.events.is_empty());
}

#[test]
fn cycles_are_detected_from_either_side()
{
        let mut view: View<Journal> = View::default();
        let mut journal = Journal::default();

        view.register_type(
                ComponentType::new("a", recording()).option(OptionSpec::dependency("b", "b")),
        )
        .unwrap();

        view.register_type(
                ComponentType::new("b", recording()).option(OptionSpec::dependency("a", "a")),
        )
        .unwrap();

        let a = view
                .add_component(1, "a", [("b", OptionValue::Entity(EntityId(2)))])
                .unwrap();

        let b = view
                .add_component(2, "b", [("a", OptionValue::Entity(EntityId(1)))])
                .unwrap();

        for key in [&a, &b]
        {
                let err = view.try_activate(key, &mut journal).unwrap_err();

                match err
                {
                        ComponentError::CyclicDependency(path) =>
                        {
                                assert_eq!(path.first(), Some(key));
                                assert_eq!(path.last(), Some(key));
                                assert_eq!(path.len(), 3);
                        }
                        other => panic!("expected a cycle, got {other:?}"),
                }
        }

        assert!(journal.events.is_empty());
}

#[test_log::test]
fn failed_activation_rolls_back_dependencies()
{
        let mut view = chain_view();
        let mut journal = Journal {
                fail_activation: vec!["a@#1".to_string()],
                ..Default::default()
        };

        let (a, b, c) = add_chain(&mut view);

        let err = view.try_activate(&a, &mut journal).unwrap_err();

        assert!(matches!(err, ComponentError::ActivationFailed { ref key, .. } if *key == a));

        assert_eq!(
                journal.take(),
                vec!["activate c@#3", "activate b@#2", "deactivate b@#2", "deactivate c@#3"]
        );

        for key in [&a, &b, &c]
        {
                assert_eq!(view.state(key), Some(ActivationState::Inactive));
        }
}

#[test]
fn failed_dependency_surfaces_as_unsatisfied()
{
        let mut view = chain_view();
        let mut journal = Journal {
                fail_activation: vec!["c@#3".to_string()],
                ..Default::default()
        };

        let (a, _, _) = add_chain(&mut view);

        let err = view.try_activate(&a, &mut journal).unwrap_err();

        assert!(matches!(err, ComponentError::UnsatisfiedDependency { ref key, .. } if *key == a));
        assert!(journal.events.is_empty());
}

#[test]
fn optional_dependency_may_be_absent()
{
        let mut view: View<Journal> = View::default();
        let mut journal = Journal::default();

        view.register_type(ComponentType::new("material", recording()))
                .unwrap();

        view.register_type(
                ComponentType::new("model", recording())
                        .option(OptionSpec::dependency("material", "material").optional()),
        )
        .unwrap();

        let model = view
                .add_component(1, "model", [("material", OptionValue::Entity(EntityId(5)))])
                .unwrap();

        view.try_activate(&model, &mut journal).unwrap();

        assert!(view.component(&model).unwrap().resolved_dependency("material").is_none());

        // Once the material exists, removing it leaves the model alone.
        let material = view
                .add_component(5, "material", Vec::<(String, OptionValue)>::new())
                .unwrap();

        view.try_activate(&material, &mut journal).unwrap();
        journal.take();

        view.remove_component(5, "material", &mut journal);

        assert_eq!(journal.take(), vec!["deactivate material@#5"]);
        assert!(view.component(&model).unwrap().is_active());
}

#[test]
fn array_dependencies_resolve_in_order()
{
        let mut view: View<Journal> = View::default();
        let mut journal = Journal::default();

        view.register_type(ComponentType::new("light", recording()))
                .unwrap();

        view.register_type(
                ComponentType::new("scene", recording())
                        .option(OptionSpec::dependency_array("lights", "light")),
        )
        .unwrap();

        for id in [7, 3]
        {
                view.add_component(id, "light", Vec::<(String, OptionValue)>::new())
                        .unwrap();
        }

        let scene = view
                .add_component(
                        1,
                        "scene",
                        [("lights", OptionValue::EntityArray(vec![EntityId(7), EntityId(3)]))],
                )
                .unwrap();

        view.try_activate(&scene, &mut journal).unwrap();

        assert_eq!(
                journal.take(),
                vec!["activate light@#7", "activate light@#3", "activate scene@#1"]
        );

        let resolved: Vec<EntityId> = view
                .component(&scene)
                .unwrap()
                .resolved_dependencies("lights")
                .iter()
                .map(|k| k.entity)
                .collect();

        assert_eq!(resolved, vec![EntityId(7), EntityId(3)]);

        let by_lookup: Vec<EntityId> = view
                .resolve_dependencies(&scene, "lights")
                .iter()
                .map(|c| c.entity())
                .collect();

        assert_eq!(by_lookup, resolved);
}

#[test]
fn add_component_validates_options()
{
        let mut view: View<Journal> = View::default();

        view.register_type(
                ComponentType::new("tileset", recording())
                        .option(OptionSpec::value("tile_width", ValueKind::Int))
                        .option(OptionSpec::value("filter", ValueKind::String).with_default("nearest")),
        )
        .unwrap();

        let err = view
                .add_component(1, "tileset", Vec::<(String, OptionValue)>::new())
                .unwrap_err();
        assert!(matches!(err, ComponentError::MissingOption { ref option, .. } if option == "tile_width"));

        let err = view
                .add_component(1, "tileset", [("tile_width", OptionValue::Float(1.0))])
                .unwrap_err();
        assert!(matches!(
                err,
                ComponentError::OptionKindMismatch {
                        expected: ValueKind::Int,
                        actual: ValueKind::Float,
                        ..
                }
        ));

        let err = view
                .add_component(1, "tileset", [("height", OptionValue::Int(1))])
                .unwrap_err();
        assert!(matches!(err, ComponentError::UnknownOption { .. }));

        let err = view
                .add_component(1, "sprite", Vec::<(String, OptionValue)>::new())
                .unwrap_err();
        assert!(matches!(err, ComponentError::UnknownType(_)));

        let key = view
                .add_component(1, "tileset", [("tile_width", OptionValue::Int(16))])
                .unwrap();
        assert_eq!(view.component(&key).unwrap().string("filter"), Some("nearest"));

        let err = view
                .add_component(1, "tileset", [("tile_width", OptionValue::Int(16))])
                .unwrap_err();
        assert!(matches!(err, ComponentError::DuplicateComponent(_)));
}

fn tunable_view() -> View<Journal>
{
        let mut view = chain_view();

        view.register_type(
                ComponentType::new(
                        "tunable",
                        recording().on_update(|component, option, env: &mut Journal| {
                                env.events
                                        .push(format!("update {} {}", component.key(), option));

                                Ok(if option == "soft" { UpdateOutcome::Applied } else { UpdateOutcome::Restart })
                        }),
                )
                .option(OptionSpec::dependency("c", "c"))
                .option(OptionSpec::value("soft", ValueKind::Int).with_default(0i64))
                .option(OptionSpec::value("hard", ValueKind::Int).with_default(0i64))
                .option(OptionSpec::value("live", ValueKind::Float).with_default(0.0).live(
                        |component, old, new, env: &mut Journal| {
                                env.events.push(format!(
                                        "live {} {:?} -> {:?}",
                                        component.key(),
                                        old.and_then(OptionValue::as_float),
                                        new.as_float()
                                ));
                        },
                )),
        )
        .unwrap();

        view
}

#[test]
fn live_update_keeps_component_active()
{
        let mut view = tunable_view();
        let mut journal = Journal::default();

        view.add_component(3, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        let key = view
                .add_component(1, "tunable", [("c", OptionValue::Entity(EntityId(3)))])
                .unwrap();

        view.try_activate(&key, &mut journal).unwrap();
        journal.take();

        view.set_option(&key, "live", OptionValue::Float(2.5), &mut journal)
                .unwrap();

        assert_eq!(journal.take(), vec!["live tunable@#1 Some(0.0) -> Some(2.5)"]);
        assert!(view.component(&key).unwrap().is_active());

        // Setting the same value again is a no-op.
        view.set_option(&key, "live", OptionValue::Float(2.5), &mut journal)
                .unwrap();

        assert!(journal.events.is_empty());
}

#[test]
fn update_can_apply_in_place_or_restart()
{
        let mut view = tunable_view();
        let mut journal = Journal::default();

        view.add_component(3, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        let key = view
                .add_component(1, "tunable", [("c", OptionValue::Entity(EntityId(3)))])
                .unwrap();

        view.try_activate(&key, &mut journal).unwrap();
        journal.take();

        view.set_option(&key, "soft", OptionValue::Int(1), &mut journal)
                .unwrap();

        assert_eq!(journal.take(), vec!["update tunable@#1 soft"]);

        view.set_option(&key, "hard", OptionValue::Int(1), &mut journal)
                .unwrap();

        assert_eq!(
                journal.take(),
                vec!["update tunable@#1 hard", "deactivate tunable@#1", "activate tunable@#1"]
        );

        assert_eq!(view.component(&key).unwrap().int("hard"), Some(1));
}

#[test_log::test]
fn restart_brings_dependents_back()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let (a, b, c) = add_chain(&mut view);

        view.add_component(4, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        view.try_activate(&a, &mut journal).unwrap();
        journal.take();

        // Retargeting b's dependency cycles b, taking a down and back up.
        view.set_option(&b, "c", OptionValue::Entity(EntityId(4)), &mut journal)
                .unwrap();

        assert_eq!(
                journal.take(),
                vec![
                        "deactivate a@#1",
                        "deactivate b@#2",
                        "activate c@#4",
                        "activate b@#2",
                        "activate a@#1"
                ]
        );

        assert_eq!(view.dependents_of(&c), Vec::<ComponentKey>::new());
        assert_eq!(view.dependents_of(&ComponentKey::new(4, "c")), vec![b.clone()]);

        // The old target can go away without touching b.
        view.remove_component(3, "c", &mut journal);

        assert_eq!(journal.take(), vec!["deactivate c@#3"]);
        assert!(view.component(&b).unwrap().is_active());
}

#[test_log::test]
fn failed_restart_keeps_the_new_value_and_leaves_the_chain_inactive()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let (a, b, _) = add_chain(&mut view);

        view.add_component(4, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        view.try_activate(&a, &mut journal).unwrap();
        journal.take();

        journal.fail_activation.push("c@#4".to_string());

        let err = view
                .set_option(&b, "c", OptionValue::Entity(EntityId(4)), &mut journal)
                .unwrap_err();

        assert!(matches!(err, ComponentError::UnsatisfiedDependency { .. }), "{err}");
        assert_eq!(journal.take(), vec!["deactivate a@#1", "deactivate b@#2"]);

        assert_eq!(view.component(&b).unwrap().option("c"), Some(&OptionValue::Entity(EntityId(4))));
        assert_eq!(view.state(&a), Some(ActivationState::Inactive));
        assert_eq!(view.state(&b), Some(ActivationState::Inactive));

        // Once the new target can activate, a plain retry brings both back.
        journal.fail_activation.clear();

        view.try_activate(&a, &mut journal).unwrap();

        assert_eq!(journal.take(), vec!["activate c@#4", "activate b@#2", "activate a@#1"]);
}

#[test]
fn set_option_rejects_wrong_kind()
{
        let mut view = tunable_view();
        let mut journal = Journal::default();

        let key = view
                .add_component(1, "tunable", [("c", OptionValue::Entity(EntityId(3)))])
                .unwrap();

        let err = view
                .set_option(&key, "soft", OptionValue::String("x".into()), &mut journal)
                .unwrap_err();

        assert!(matches!(err, ComponentError::OptionKindMismatch { .. }));
        assert_eq!(view.component(&key).unwrap().int("soft"), Some(0));
}

#[test]
fn activate_pending_reports_what_is_missing()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        view.add_component(1, "a", [("b", OptionValue::Entity(EntityId(2)))])
                .unwrap();

        view.add_component(5, "c", Vec::<(String, OptionValue)>::new())
                .unwrap();

        let failures = view.activate_pending(&mut journal);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ComponentKey::new(1, "a"));
        assert_eq!(journal.take(), vec!["activate c@#5"]);

        // The missing entity shows up later; the caller retries.
        view.add_component(2, "b", [("c", OptionValue::Entity(EntityId(5)))])
                .unwrap();

        assert!(view.activate_pending(&mut journal).is_empty());
        assert_eq!(journal.take(), vec!["activate b@#2", "activate a@#1"]);
}

#[test]
fn deactivate_all_tears_down_top_down()
{
        let mut view = chain_view();
        let mut journal = Journal::default();

        let (a, _, c) = add_chain(&mut view);

        view.try_activate(&a, &mut journal).unwrap();
        journal.take();

        view.deactivate_all(&mut journal);

        assert_eq!(journal.take(), vec!["deactivate a@#1", "deactivate b@#2", "deactivate c@#3"]);
        assert_eq!(view.state(&c), Some(ActivationState::Inactive));

        assert!(view.deactivate(&a, &mut journal).unwrap().is_empty());
}

#[test]
fn system_data_is_visible_to_dependents()
{
        let mut view: View<Journal> = View::default();
        let mut journal = Journal::default();

        view.register_type(ComponentType::new(
                "texture",
                Callbacks::new(|_: &mut ActivationContext<'_, Journal>| Ok(Box::new(42u32))),
        ))
        .unwrap();

        view.register_type(
                ComponentType::new(
                        "sprite",
                        Callbacks::new(|ctx: &mut ActivationContext<'_, Journal>| {
                                let handle = *ctx.dependency_data::<u32>("texture")?;

                                ctx.env.events.push(format!("sprite sees {handle}"));

                                Ok(Box::new(handle))
                        }),
                )
                .option(OptionSpec::dependency("texture", "texture")),
        )
        .unwrap();

        view.add_component(1, "texture", Vec::<(String, OptionValue)>::new())
                .unwrap();

        let sprite = view
                .add_component(2, "sprite", [("texture", OptionValue::Entity(EntityId(1)))])
                .unwrap();

        view.try_activate(&sprite, &mut journal).unwrap();

        assert_eq!(journal.events, vec!["sprite sees 42"]);
        assert_eq!(view.component(&sprite).unwrap().system_data::<u32>(), Some(&42));
}

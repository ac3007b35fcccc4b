//! Validation of content written by the kernel itself.

use tac_core::campaign::Campaign;
use tac_core::effects::{Effect, EffectAction, Effects, Trigger};
use tac_tools::validate::{validate_data_directory, validate_map_file};
use tac_test_utils::fixtures::{duel_map, skirmish_map};

#[test]
fn test_fixture_content_validates() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("duel.json"), duel_map().to_json().unwrap()).unwrap();
    std::fs::write(root.join("skirmish.json"), skirmish_map().to_json().unwrap()).unwrap();

    let effects = Effects::new().push(
        Trigger::GameEnd,
        Effect::new(vec![EffectAction::Message {
            message: "Victory".into(),
            player: None,
        }]),
    );
    std::fs::write(root.join("duel.effects.json"), effects.to_json().unwrap()).unwrap();

    let campaign = Campaign::new("tour", "duel")
        .connect("duel", "skirmish", Some(1))
        .unwrap();
    std::fs::write(root.join("tour.campaign.json"), campaign.to_json().unwrap()).unwrap();

    let report = validate_data_directory(root).unwrap();
    assert_eq!(report.checked, 4);
    assert!(report.is_valid(), "{:?}", report.errors);
    // Dialogue at GameEnd is moved to Start when prepared.
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].path.ends_with("duel.effects.json"));

    let map = validate_map_file(&root.join("skirmish.json")).unwrap();
    assert_eq!(map, skirmish_map());
}

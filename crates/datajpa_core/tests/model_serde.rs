use datajpa_core::{AuditFields, Fetched, Item, LockMode, Member, MemberDto, Page, Ref, Team};
use serde_json::json;

#[test]
fn member_wire_shape_uses_snake_case() {
    let mut team = Team::new("teamA");
    team.id = Some(7);
    let mut member = Member::with_team("member1", 10, &team).unwrap();
    member.id = Some(3);
    member.audit = AuditFields {
        created_at: Some(1_000),
        last_modified_at: Some(2_000),
    };

    let value = serde_json::to_value(&member).unwrap();
    assert_eq!(
        value,
        json!({
            "id": 3,
            "username": "member1",
            "age": 10,
            "team": { "unloaded": 7 },
            "audit": { "created_at": 1000, "last_modified_at": 2000 }
        })
    );

    let decoded: Member = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, member);
}

#[test]
fn loaded_reference_carries_the_record() {
    let mut team = Team::new("teamA");
    team.id = Some(1);
    let reference = Ref::loaded(team).unwrap();

    let value = serde_json::to_value(&reference).unwrap();
    assert_eq!(value["loaded"]["id"], json!(1));
    assert_eq!(value["loaded"]["value"]["name"], json!("teamA"));
    assert_eq!(value["loaded"]["value"]["members"], json!("not_loaded"));
}

#[test]
fn team_members_default_to_not_loaded() {
    let decoded: Team = serde_json::from_value(json!({
        "id": 1,
        "name": "teamA",
        "audit": { "created_at": null, "last_modified_at": null }
    }))
    .unwrap();
    assert_eq!(decoded.members, Fetched::NotLoaded);
}

#[test]
fn page_and_projection_serialize_metadata() {
    let page = Page::new(
        vec![MemberDto {
            id: 1,
            username: "member1".to_string(),
            team_name: "teamA".to_string(),
        }],
        0,
        3,
        5,
    );
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["total_pages"], json!(2));
    assert_eq!(value["has_next"], json!(true));
    assert_eq!(value["content"][0]["team_name"], json!("teamA"));
}

#[test]
fn item_and_lock_mode_wire_names() {
    let item = Item::new("A");
    assert_eq!(serde_json::to_value(&item).unwrap()["id"], json!("A"));
    assert_eq!(
        serde_json::to_value(LockMode::PessimisticWrite).unwrap(),
        json!("pessimistic_write")
    );
}

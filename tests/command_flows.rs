mod common;

use common::{member, moderator, ny, processor, GROUP};
use mobwatch::tracker::{Confidence, MobRecord};

#[tokio::test]
async fn tod_learns_window_and_status_reports_it() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);

    let first = p.handle_at(&member(), "!tod Pumpkinhead 0200", now).await;
    assert_eq!(
        first.as_deref(),
        Some("☠️ Recorded TOD for **Pumpkinhead** at `2025-12-05 02:00`.")
    );

    let second = p.handle_at(&member(), "!tod pumpkinhead 1400", now).await;
    assert_eq!(
        second.as_deref(),
        Some(
            "☠️ Recorded TOD for **pumpkinhead** at `2025-12-05 14:00`.\n\
             🧠 Auto-learned window: **11.4–12.6 hours** (confidence: LOW)."
        )
    );

    let status = p.handle_at(&member(), "!status", now).await.unwrap();
    assert_eq!(
        status,
        "__**Contested Mob Spawn Windows**__\n\
         ⏳ pumpkinhead — window CLOSED, opens in **10h 24m** (confidence: LOW)"
    );

    let group = p.storage().load_group(GROUP).await.unwrap();
    let mob = &group.mobs["pumpkinhead"];
    assert_eq!(mob.tod_history.len(), 2);
    assert_eq!(mob.min_respawn_hours, Some(11.4));
    assert_eq!(mob.max_respawn_hours, Some(12.6));
    assert_eq!(mob.learned_confidence, Confidence::Low);
}

#[tokio::test]
async fn tod_without_time_uses_now() {
    let (_tmp, p) = processor().await;
    let reply = p
        .handle_at(&member(), "!tod Pumpkinhead", ny(2025, 12, 5, 15, 7))
        .await
        .unwrap();
    assert_eq!(
        reply,
        "☠️ Recorded TOD for **Pumpkinhead** at `2025-12-05 15:07`."
    );
}

#[tokio::test]
async fn tod_date_without_time_is_rejected_and_nothing_is_saved() {
    let (_tmp, p) = processor().await;
    let reply = p
        .handle_at(&member(), "!tod Pumpkinhead 2025-12-05", ny(2025, 12, 5, 15, 0))
        .await
        .unwrap();
    assert!(reply.contains("both date AND time"), "{}", reply);
    assert!(p.storage().list_groups().await.unwrap().is_empty());
}

#[tokio::test]
async fn tod_rejects_out_of_range_clock() {
    let (_tmp, p) = processor().await;
    let reply = p
        .handle_at(&member(), "!tod Drake 2575", ny(2025, 12, 5, 15, 0))
        .await
        .unwrap();
    assert!(reply.starts_with("Invalid time:"), "{}", reply);
    assert!(p.storage().load_group(GROUP).await.unwrap().mobs.is_empty());
}

#[tokio::test]
async fn tod_on_repeated_hour_takes_earliest_occurrence() {
    let (_tmp, p) = processor().await;
    p.handle_at(&member(), "!tod Pumpkinhead 2025-11-02 0130", ny(2025, 11, 3, 9, 0))
        .await
        .unwrap();
    let group = p.storage().load_group(GROUP).await.unwrap();
    let at = group.mobs["pumpkinhead"].last_death.unwrap();
    assert_eq!(at.offset().local_minus_utc(), -4 * 3600);
}

#[tokio::test]
async fn spawn_and_setwindow_drive_the_board_line() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);

    let reply = p.handle_at(&member(), "!spawn Haraghur 0930", now).await;
    assert_eq!(
        reply.as_deref(),
        Some("🌱 Recorded spawn for **Haraghur** at `2025-12-05 09:30`.")
    );
    let status = p.handle_at(&member(), "!status", now).await.unwrap();
    assert!(
        status.ends_with("⚠️ Haraghur — no spawn window (`!setwindow Haraghur min max`)"),
        "{}",
        status
    );

    let reply = p.handle_at(&member(), "!setwindow Haraghur 8 12", now).await;
    assert_eq!(
        reply.as_deref(),
        Some("⏱️ Window for **Haraghur** set to **8.0-12.0 hours**.")
    );
    let status = p.handle_at(&member(), "!status", now).await.unwrap();
    assert!(
        status.ends_with("⏳ Haraghur — window CLOSED, opens in **2h 30m** (confidence: LOW)"),
        "{}",
        status
    );
}

#[tokio::test]
async fn setwindow_validation_leaves_record_alone() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);
    p.handle_at(&member(), "!setwindow Haraghur 8 12", now).await;

    let reply = p.handle_at(&member(), "!setwindow Haraghur 12 8", now).await;
    assert_eq!(
        reply.as_deref(),
        Some("Invalid window: min must not exceed max.")
    );
    let reply = p.handle_at(&member(), "!setwindow Haraghur 0 8", now).await;
    assert_eq!(
        reply.as_deref(),
        Some("Invalid window: min and max must be greater than zero.")
    );
    let reply = p.handle_at(&member(), "!setwindow Haraghur soon later", now).await;
    assert_eq!(reply.as_deref(), Some("min and max must be numbers."));

    let group = p.storage().load_group(GROUP).await.unwrap();
    assert_eq!(group.mobs["haraghur"].min_respawn_hours, Some(8.0));
    assert_eq!(group.mobs["haraghur"].max_respawn_hours, Some(12.0));
}

#[tokio::test]
async fn oversized_windows_are_rejected_and_stored_ones_still_render() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);

    let reply = p
        .handle_at(&member(), "!setwindow Boss 3000000000 3000000000", now)
        .await;
    assert_eq!(
        reply.as_deref(),
        Some("Invalid window: max must be at most 10000 hours.")
    );
    assert!(p.storage().load_group(GROUP).await.unwrap().mobs.is_empty());

    // A record written before the bound existed.
    p.storage()
        .update_group(GROUP, |g| {
            let mut mob = MobRecord::new("Boss");
            mob.min_respawn_hours = Some(3_000_000_000.0);
            mob.max_respawn_hours = Some(3_000_000_000.0);
            g.mobs.insert("boss".to_string(), mob);
            Ok(())
        })
        .await
        .unwrap();
    p.handle_at(&member(), "!spawn Boss 0900", now).await;
    let status = p.handle_at(&member(), "!status", now).await.unwrap();
    assert!(status.contains("⏳ Boss — window CLOSED"), "{}", status);
}

#[tokio::test]
async fn track_untrack_and_placeholders() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);

    assert_eq!(
        p.handle_at(&member(), "!status", now).await.as_deref(),
        Some("No mobs tracked.")
    );
    assert_eq!(
        p.handle_at(&member(), "!untrack Ghost", now).await.as_deref(),
        Some("Mob **Ghost** not found.")
    );
    assert_eq!(
        p.handle_at(&member(), "!track Vraksakin", now).await.as_deref(),
        Some("🟢 Tracking **Vraksakin** enabled.")
    );
    assert_eq!(
        p.handle_at(&member(), "!untrack vraksakin", now).await.as_deref(),
        Some("🔴 Tracking **vraksakin** disabled.")
    );
    assert_eq!(
        p.handle_at(&member(), "!status", now).await.as_deref(),
        Some("No mobs have tracking enabled.")
    );

    // track never toggles: repeating it keeps tracking on
    p.handle_at(&member(), "!track Vraksakin", now).await;
    p.handle_at(&member(), "!track Vraksakin", now).await;
    let group = p.storage().load_group(GROUP).await.unwrap();
    assert!(group.mobs["vraksakin"].tracking);
}

#[tokio::test]
async fn ambiguous_names_abort_without_mutation() {
    let (_tmp, p) = processor().await;
    p.storage()
        .update_group(GROUP, |g| {
            g.mobs
                .insert("blood drake".into(), MobRecord::new("Blood Drake"));
            g.mobs.insert("bone drake".into(), MobRecord::new("Bone Drake"));
            Ok(())
        })
        .await
        .unwrap();

    let reply = p
        .handle_at(&member(), "!tod drake 0200", ny(2025, 12, 5, 15, 0))
        .await
        .unwrap();
    assert_eq!(
        reply,
        "Mob name ambiguous. Did you mean:\n • Bone Drake\n • Blood Drake"
    );

    let group = p.storage().load_group(GROUP).await.unwrap();
    assert_eq!(group.mobs.len(), 2);
    assert!(group.mobs.values().all(|m| m.tod_history.is_empty()));
}

#[tokio::test]
async fn rename_moves_key_and_refuses_collisions() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);
    p.handle_at(&member(), "!track Pumpkinhead", now).await;
    p.handle_at(&member(), "!track Vraksakin", now).await;

    assert_eq!(
        p.handle_at(&member(), "!renamemob Vraksakin | pumpkinhead", now)
            .await
            .as_deref(),
        Some("A mob named **pumpkinhead** already exists.")
    );
    assert_eq!(
        p.handle_at(&member(), "!renamemob Pumpkinhead | Lord Pumpkin", now)
            .await
            .as_deref(),
        Some("✏️ Renamed **Pumpkinhead** → **Lord Pumpkin**.")
    );

    let group = p.storage().load_group(GROUP).await.unwrap();
    let keys: Vec<&str> = group.mobs.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["lord pumpkin", "vraksakin"]);
    assert_eq!(group.mobs["lord pumpkin"].display_name, "Lord Pumpkin");
}

#[tokio::test]
async fn deletemob_removes_everything() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);
    p.handle_at(&member(), "!tod Pumpkinhead 0200", now).await;
    assert_eq!(
        p.handle_at(&member(), "!deletemob Pumpkinhead", now)
            .await
            .as_deref(),
        Some("🗑️ Deleted mob **Pumpkinhead**.")
    );
    assert!(p.storage().load_group(GROUP).await.unwrap().mobs.is_empty());
    assert_eq!(
        p.handle_at(&member(), "!deletemob Pumpkinhead", now)
            .await
            .as_deref(),
        Some("Mob **Pumpkinhead** not found.")
    );
}

#[tokio::test]
async fn undo_relearns_then_clears() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);
    for cmd in [
        "!tod Pumpkinhead 2025-12-03 0200",
        "!tod Pumpkinhead 2025-12-03 1400",
        "!tod Pumpkinhead 2025-12-04 0200",
    ] {
        p.handle_at(&member(), cmd, now).await.unwrap();
    }

    let reply = p.handle_at(&member(), "!undo Pumpkinhead", now).await.unwrap();
    assert_eq!(
        reply,
        "↩️ Removed last TOD (`2025-12-04T02:00:00-05:00`).\n\
         New window: **11.4–12.6 hours** (confidence: LOW)."
    );

    let reply = p.handle_at(&member(), "!undo Pumpkinhead", now).await.unwrap();
    assert_eq!(
        reply,
        "↩️ Removed last TOD (`2025-12-03T14:00:00-05:00`).\n\
         Not enough TOD data to compute a window."
    );
    let group = p.storage().load_group(GROUP).await.unwrap();
    let mob = &group.mobs["pumpkinhead"];
    assert_eq!(mob.window(), None);
    assert_eq!(mob.learned_confidence, Confidence::Low);

    p.handle_at(&member(), "!undo Pumpkinhead", now).await.unwrap();
    assert_eq!(
        p.handle_at(&member(), "!undo Pumpkinhead", now).await.as_deref(),
        Some("No TOD history for **Pumpkinhead**.")
    );
}

#[tokio::test]
async fn setstatuschannel_requires_manage_channels() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);

    assert_eq!(
        p.handle_at(&member(), "!setstatuschannel", now).await.as_deref(),
        Some("You need the Manage Channels permission to do that.")
    );
    assert!(p.storage().list_groups().await.unwrap().is_empty());

    assert_eq!(
        p.handle_at(&moderator(), "!setstatuschannel", now)
            .await
            .as_deref(),
        Some("📡 Status updates will now appear in <#100>.")
    );
    p.storage()
        .update_group(GROUP, |g| {
            g.status_message_id = Some(77);
            Ok(())
        })
        .await
        .unwrap();

    p.handle_at(&moderator(), "!setstatuschannel <#555>", now).await;
    let group = p.storage().load_group(GROUP).await.unwrap();
    assert_eq!(group.status_channel_id, Some(555));
    assert_eq!(group.status_message_id, None);
}

#[tokio::test]
async fn non_commands_are_ignored() {
    let (_tmp, p) = processor().await;
    let now = ny(2025, 12, 5, 15, 0);
    assert_eq!(p.handle_at(&member(), "anyone seen the drake?", now).await, None);
    assert_eq!(p.handle_at(&member(), "!dance", now).await, None);
    let help = p.handle_at(&member(), "!help", now).await.unwrap();
    assert!(help.contains("`!tod MobName"));
    assert!(p.storage().list_groups().await.unwrap().is_empty());
}

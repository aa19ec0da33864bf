use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use roster_keeper::api::{create_router, BranchDetail};
use roster_keeper::db::Database;
use roster_keeper::discord::MemorySink;
use roster_keeper::models::*;
use roster_keeper::roster::{RefreshSummary, RosterEmbed, RosterPublisher};
use uuid::Uuid;

fn setup() -> (TestServer, Arc<MemorySink>) {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let sink = Arc::new(MemorySink::new());
    let publisher = RosterPublisher::new(db.clone(), sink.clone(), "roster-channel");
    let app = create_router(db, publisher);
    (
        TestServer::new(app).expect("Failed to create test server"),
        sink,
    )
}

async fn create_branch(server: &TestServer, name: &str, layout: LayoutKind) -> Branch {
    server
        .post("/api/v1/branches")
        .json(&CreateBranchInput {
            name: name.to_string(),
            emoji: Some("🔴".to_string()),
            layout,
            ..Default::default()
        })
        .await
        .json::<Branch>()
}

async fn create_rank(server: &TestServer, branch_id: Uuid, name: &str) -> Rank {
    server
        .post(&format!("/api/v1/branches/{}/ranks", branch_id))
        .json(&CreateRankInput {
            name: name.to_string(),
            display_order: 0,
        })
        .await
        .json::<Rank>()
}

async fn add_member(server: &TestServer, branch_id: Uuid, rank_id: Uuid, name: &str) -> Member {
    server
        .post(&format!("/api/v1/branches/{}/members", branch_id))
        .json(&CreateMemberInput {
            rank_id,
            sub_branch_id: None,
            name: name.to_string(),
            alt: None,
            title: None,
            notes: None,
        })
        .await
        .json::<Member>()
}

mod branches {
    use super::*;

    #[tokio::test]
    async fn creating_a_branch_posts_its_roster_message() {
        let (server, sink) = setup();

        let response = server
            .post("/api/v1/branches")
            .json(&CreateBranchInput {
                name: "SITH ORDER".to_string(),
                ..Default::default()
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let branch: Branch = response.json();
        assert!(branch.message_id.is_some());
        assert_eq!(sink.message_count(), 1);
    }

    #[tokio::test]
    async fn rejects_blank_names() {
        let (server, _sink) = setup();

        let response = server
            .post("/api/v1/branches")
            .json(&CreateBranchInput {
                name: "   ".to_string(),
                ..Default::default()
            })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn duplicate_name_is_a_bad_request() {
        let (server, _sink) = setup();
        create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;

        let response = server
            .post("/api/v1/branches")
            .json(&CreateBranchInput {
                name: "SITH ORDER".to_string(),
                ..Default::default()
            })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn get_returns_ranks_and_sub_branches() {
        let (server, _sink) = setup();
        let branch = create_branch(&server, "CIVIL AFFAIRS", LayoutKind::Grouped).await;
        create_rank(&server, branch.id, "GOVERNOR").await;
        server
            .post(&format!("/api/v1/branches/{}/sub-branches", branch.id))
            .json(&CreateSubBranchInput {
                name: "Research Division".to_string(),
                display_order: 0,
            })
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get(&format!("/api/v1/branches/{}", branch.id)).await;

        response.assert_status_ok();
        let detail: BranchDetail = response.json();
        assert_eq!(detail.branch.name, "CIVIL AFFAIRS");
        assert_eq!(detail.ranks.len(), 1);
        assert_eq!(detail.sub_branches[0].name, "Research Division");
    }

    #[tokio::test]
    async fn get_missing_branch_is_not_found() {
        let (server, _sink) = setup();

        let response = server
            .get(&format!("/api/v1/branches/{}", Uuid::new_v4()))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn nested_routes_on_missing_branch_are_not_found() {
        let (server, _sink) = setup();
        let missing = Uuid::new_v4();

        server
            .post(&format!("/api/v1/branches/{}/ranks", missing))
            .json(&CreateRankInput {
                name: "DARTH".to_string(),
                display_order: 0,
            })
            .await
            .assert_status_not_found();
        server
            .post(&format!("/api/v1/branches/{}/sub-branches", missing))
            .json(&CreateSubBranchInput {
                name: "Talon Squadron".to_string(),
                display_order: 0,
            })
            .await
            .assert_status_not_found();
        server
            .get(&format!("/api/v1/branches/{}/members", missing))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn update_switches_layout() {
        let (server, _sink) = setup();
        let branch = create_branch(&server, "IMPERIAL NAVY", LayoutKind::Grouped).await;

        let response = server
            .put(&format!("/api/v1/branches/{}", branch.id))
            .json(&UpdateBranchInput {
                layout: Some(LayoutKind::DualSection),
                special_section: Some("Talon Squadron".to_string()),
                ..Default::default()
            })
            .await;

        response.assert_status_ok();
        let updated: Branch = response.json();
        assert_eq!(updated.layout, LayoutKind::DualSection);
    }

    #[tokio::test]
    async fn delete_removes_branch_and_its_message() {
        let (server, sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        assert_eq!(sink.message_count(), 1);

        server
            .delete(&format!("/api/v1/branches/{}", branch.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        assert_eq!(sink.message_count(), 0);
        server
            .get(&format!("/api/v1/branches/{}", branch.id))
            .await
            .assert_status_not_found();
    }
}

mod members {
    use super::*;

    #[tokio::test]
    async fn adding_a_member_updates_the_roster_message() {
        let (server, sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let rank = create_rank(&server, branch.id, "DARTH").await;

        let response = server
            .post(&format!("/api/v1/branches/{}/members", branch.id))
            .json(&CreateMemberInput {
                rank_id: rank.id,
                sub_branch_id: None,
                name: "Draxos Azra".to_string(),
                alt: Some("Nolan".to_string()),
                title: None,
                notes: Some("Founding member".to_string()),
            })
            .await;
        response.assert_status(StatusCode::CREATED);

        let embed = sink.embed(branch.message_id.as_deref().unwrap()).unwrap();
        assert_eq!(embed.fields[0].value, "\n**DARTH**\n• Draxos Azra (Nolan)\n");
        assert_eq!(sink.message_count(), 1);
    }

    #[tokio::test]
    async fn rank_from_another_branch_is_rejected() {
        let (server, _sink) = setup();
        let sith = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let navy = create_branch(&server, "IMPERIAL NAVY", LayoutKind::DualSection).await;
        let admiral = create_rank(&server, navy.id, "ADMIRAL").await;

        let response = server
            .post(&format!("/api/v1/branches/{}/members", sith.id))
            .json(&CreateMemberInput {
                rank_id: admiral.id,
                sub_branch_id: None,
                name: "Vex".to_string(),
                alt: None,
                title: None,
                notes: None,
            })
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn list_returns_joined_rows() {
        let (server, _sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let rank = create_rank(&server, branch.id, "SITH").await;
        add_member(&server, branch.id, rank.id, "Qorvos Rist").await;

        let response = server
            .get(&format!("/api/v1/branches/{}/members", branch.id))
            .await;

        response.assert_status_ok();
        let rows: Vec<MemberRow> = response.json();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank_name, "SITH");
        assert!(rows[0].sub_branch_name.is_none());
    }

    #[tokio::test]
    async fn delete_by_id() {
        let (server, sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let rank = create_rank(&server, branch.id, "SITH").await;
        let member = add_member(&server, branch.id, rank.id, "Ryangonja").await;

        server
            .delete(&format!("/api/v1/members/{}", member.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let embed = sink.embed(branch.message_id.as_deref().unwrap()).unwrap();
        assert_eq!(embed.fields[0].value, "No members assigned");
    }

    #[tokio::test]
    async fn delete_by_name_reports_count() {
        let (server, _sink) = setup();
        let sith = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let navy = create_branch(&server, "IMPERIAL NAVY", LayoutKind::DualSection).await;
        let sith_rank = create_rank(&server, sith.id, "SITH").await;
        let navy_rank = create_rank(&server, navy.id, "ADMIRAL").await;
        add_member(&server, sith.id, sith_rank.id, "Draven Exorius").await;
        add_member(&server, navy.id, navy_rank.id, "Draven Exorius").await;

        let response = server
            .delete("/api/v1/members")
            .add_query_param("name", "Draven Exorius")
            .await;

        response.assert_status_ok();
        let removed: RemovedMembers = response.json();
        assert_eq!(removed.removed, 2);
    }

    #[tokio::test]
    async fn delete_by_unknown_name_is_not_found() {
        let (server, _sink) = setup();

        server
            .delete("/api/v1/members")
            .add_query_param("name", "Nobody")
            .await
            .assert_status_not_found();
    }
}

mod roster {
    use super::*;

    #[tokio::test]
    async fn preview_renders_without_posting() {
        let (server, sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        let sends = sink.send_count();

        let response = server
            .get(&format!("/api/v1/branches/{}/roster", branch.id))
            .await;

        response.assert_status_ok();
        let embed: RosterEmbed = response.json();
        assert_eq!(embed.title, "🔴 SITH ORDER");
        assert_eq!(sink.send_count(), sends);
    }

    #[tokio::test]
    async fn refresh_edits_existing_message() {
        let (server, sink) = setup();
        let branch = create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;

        let response = server
            .post(&format!("/api/v1/branches/{}/refresh", branch.id))
            .await;

        response.assert_status_ok();
        let outcome: serde_json::Value = response.json();
        assert_eq!(outcome["outcome"], "edited");
        assert_eq!(outcome["message_id"], branch.message_id.unwrap());
        assert_eq!(sink.send_count(), 1);
    }

    #[tokio::test]
    async fn refresh_missing_branch_is_not_found() {
        let (server, _sink) = setup();

        server
            .post(&format!("/api/v1/branches/{}/refresh", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn refresh_all_reports_summary() {
        let (server, _sink) = setup();
        create_branch(&server, "SITH ORDER", LayoutKind::Grouped).await;
        create_branch(&server, "IMPERIAL NAVY", LayoutKind::DualSection).await;

        let response = server.post("/api/v1/refresh").await;

        response.assert_status_ok();
        let summary: RefreshSummary = response.json();
        assert_eq!(summary.synced, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn health_check() {
        let (server, _sink) = setup();

        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
    }
}

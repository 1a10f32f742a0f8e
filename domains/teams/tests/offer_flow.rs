//! Offer scenarios: both directions, decisions, cascades, races

mod common;

use common::{register, setup, setup_with, team_command};
use crewup_common::PageRequest;
use crewup_notify::TeamEvent;
use crewup_teams::{
    Capacities, CascadeScope, OfferState, OfferedBy, Position, TeamsError,
};
use uuid::Uuid;

#[tokio::test]
async fn user_offer_requires_an_open_slot() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let hopeful = register(&app, "hopeful").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(0, 1, 0, 0)),
        )
        .await
        .unwrap();

    let err = app
        .offers
        .offer_by_user(hopeful.id, team.id, Position::Backend)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::TeamPositionUnavailable);

    let err = app
        .offers
        .offer_by_user(hopeful.id, Uuid::new_v4(), Position::Designer)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::TeamNotFound);
}

#[tokio::test]
async fn leader_offer_requires_a_free_target() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let other = register(&app, "other").await;
    app.teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();
    app.teams
        .create_team(
            other.id,
            team_command("beta", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();

    // Target already leads a team in progress
    let err = app
        .offers
        .offer_by_team(founder.id, other.id, Position::Designer)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::ExistingCurrentTeam);

    let err = app
        .offers
        .offer_by_team(founder.id, Uuid::new_v4(), Position::Designer)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::UserNotFound);

    // Only someone with a current team can invite, and only its leader
    let free = register(&app, "free").await;
    let err = app
        .offers
        .offer_by_team(free.id, other.id, Position::Designer)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::CurrentTeamNotFound);
}

#[tokio::test]
async fn accepted_request_admits_the_member() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let hopeful = register(&app, "hopeful").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();

    let offer = app
        .offers
        .offer_by_user(hopeful.id, team.id, Position::Designer)
        .await
        .unwrap();
    assert!(app
        .notifier
        .events()
        .iter()
        .any(|e| matches!(e, TeamEvent::OfferReceived { offer_id, .. } if *offer_id == offer.id)));

    let member = app
        .offers
        .team_decide(founder.id, offer.id, true)
        .await
        .unwrap()
        .expect("admission");
    assert_eq!(member.user_id, hopeful.id);
    assert_eq!(member.position, Position::Designer);

    let (current, members) = app.teams.current_team(hopeful.id).await.unwrap();
    assert_eq!(current.id, team.id);
    assert_eq!(members.len(), 2);
    assert!(app
        .notifier
        .events()
        .iter()
        .any(|e| matches!(e, TeamEvent::MemberJoined { user_id, .. } if *user_id == hopeful.id)));
}

#[tokio::test]
async fn decision_authorization_is_side_sensitive() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let hopeful = register(&app, "hopeful").await;
    let bystander = register(&app, "bystander").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();

    let request = app
        .offers
        .offer_by_user(hopeful.id, team.id, Position::Designer)
        .await
        .unwrap();

    // A user-sent request is the team's to decide, not the sender's
    let err = app
        .offers
        .user_decide(hopeful.id, request.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    let invitation = app
        .offers
        .offer_by_team(founder.id, bystander.id, Position::Designer)
        .await
        .unwrap();

    // An invitation belongs to its addressee
    let err = app
        .offers
        .user_decide(hopeful.id, invitation.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    // And a leader cannot decide an invitation through the team route
    let err = app
        .offers
        .team_decide(founder.id, invitation.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    app.offers.user_decide(bystander.id, invitation.id, true).await.unwrap();
}

#[tokio::test]
async fn decided_offers_read_as_absent() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let hopeful = register(&app, "hopeful").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();
    let offer = app
        .offers
        .offer_by_user(hopeful.id, team.id, Position::Designer)
        .await
        .unwrap();

    app.offers.team_decide(founder.id, offer.id, false).await.unwrap();

    let err = app
        .offers
        .team_decide(founder.id, offer.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::OfferNotFound);
    let err = app
        .offers
        .cancel_by_user(hopeful.id, offer.id)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::OfferNotFound);

    // Declined offers stay listed for the audit trail
    let listed = app
        .offers
        .list_user_offers(hopeful.id, OfferedBy::User, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.data[0].state(), OfferState::Declined);
}

#[tokio::test]
async fn acceptance_cascades_over_other_pending_offers() {
    let app = setup();
    let a = register(&app, "a").await;
    let b = register(&app, "b").await;
    let hopeful = register(&app, "hopeful").await;
    let (team_a, _) = app
        .teams
        .create_team(a.id, team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)))
        .await
        .unwrap();
    let (team_b, _) = app
        .teams
        .create_team(b.id, team_command("beta", Position::Backend, Capacities::new(1, 1, 0, 0)))
        .await
        .unwrap();

    let to_a = app
        .offers
        .offer_by_user(hopeful.id, team_a.id, Position::Designer)
        .await
        .unwrap();
    let to_b = app
        .offers
        .offer_by_user(hopeful.id, team_b.id, Position::Designer)
        .await
        .unwrap();

    app.offers.team_decide(a.id, to_a.id, true).await.unwrap();

    // The competing offer is void; team B cannot accept it anymore
    let err = app.offers.team_decide(b.id, to_b.id, true).await.unwrap_err();
    assert_eq!(err, TeamsError::OfferNotFound);

    let listed = app
        .offers
        .list_user_offers(hopeful.id, OfferedBy::User, PageRequest::first())
        .await
        .unwrap();
    let states: Vec<(Uuid, OfferState)> = listed.data.iter().map(|o| (o.id, o.state())).collect();
    assert!(states.contains(&(to_a.id, OfferState::Accepted)));
    assert!(states.contains(&(to_b.id, OfferState::Cancelled)));
}

#[tokio::test]
async fn same_position_cascade_spares_other_positions() {
    let app = setup_with(CascadeScope::SamePosition);
    let a = register(&app, "a").await;
    let b = register(&app, "b").await;
    let hopeful = register(&app, "hopeful").await;
    let (team_a, _) = app
        .teams
        .create_team(a.id, team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)))
        .await
        .unwrap();
    let (team_b, _) = app
        .teams
        .create_team(b.id, team_command("beta", Position::Backend, Capacities::new(1, 1, 1, 0)))
        .await
        .unwrap();

    let designer_a = app
        .offers
        .offer_by_user(hopeful.id, team_a.id, Position::Designer)
        .await
        .unwrap();
    let designer_b = app
        .offers
        .offer_by_user(hopeful.id, team_b.id, Position::Designer)
        .await
        .unwrap();
    let frontend_b = app
        .offers
        .offer_by_user(hopeful.id, team_b.id, Position::Frontend)
        .await
        .unwrap();

    app.offers.team_decide(a.id, designer_a.id, true).await.unwrap();

    let listed = app
        .offers
        .list_user_offers(hopeful.id, OfferedBy::User, PageRequest::first())
        .await
        .unwrap();
    for offer in &listed.data {
        let expected = match offer.id {
            id if id == designer_a.id => OfferState::Accepted,
            id if id == designer_b.id => OfferState::Cancelled,
            id if id == frontend_b.id => OfferState::Pending,
            id => panic!("unexpected offer {id}"),
        };
        assert_eq!(offer.state(), expected);
    }

    // The spared offer still cannot be accepted while the membership is active
    let err = app
        .offers
        .team_decide(b.id, frontend_b.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::ExistingCurrentTeam);
}

#[tokio::test]
async fn withdrawal_is_proposer_only() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let hopeful = register(&app, "hopeful").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();

    let request = app
        .offers
        .offer_by_user(hopeful.id, team.id, Position::Designer)
        .await
        .unwrap();
    let invitation = app
        .offers
        .offer_by_team(founder.id, hopeful.id, Position::Designer)
        .await
        .unwrap();

    // The receiving side cannot withdraw
    let err = app
        .offers
        .cancel_by_team(founder.id, request.id)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);
    let err = app
        .offers
        .cancel_by_user(hopeful.id, invitation.id)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    app.offers.cancel_by_user(hopeful.id, request.id).await.unwrap();
    app.offers.cancel_by_team(founder.id, invitation.id).await.unwrap();

    let err = app
        .offers
        .cancel_by_user(hopeful.id, request.id)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::OfferNotFound);
}

#[tokio::test]
async fn non_leader_member_cannot_act_for_the_team() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let joined = register(&app, "joined").await;
    let outsider = register(&app, "outsider").await;
    let target = register(&app, "target").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 1, 0)),
        )
        .await
        .unwrap();

    let request = app
        .offers
        .offer_by_user(joined.id, team.id, Position::Designer)
        .await
        .unwrap();
    app.offers.team_decide(founder.id, request.id, true).await.unwrap();

    let pending = app
        .offers
        .offer_by_user(outsider.id, team.id, Position::Frontend)
        .await
        .unwrap();

    // Membership alone grants none of the leader's powers
    let err = app
        .offers
        .offer_by_team(joined.id, target.id, Position::Frontend)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    let err = app
        .offers
        .team_decide(joined.id, pending.id, true)
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);

    let err = app
        .offers
        .list_team_offers(joined.id, None, OfferedBy::User, PageRequest::first())
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::RequestForbidden);
}

#[tokio::test]
async fn team_listing_filters_by_direction_and_position() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(2, 1, 1, 0)),
        )
        .await
        .unwrap();

    for (name, position) in [
        ("d1", Position::Designer),
        ("d2", Position::Designer),
        ("f1", Position::Frontend),
    ] {
        let user = register(&app, name).await;
        app.offers
            .offer_by_user(user.id, team.id, position)
            .await
            .unwrap();
    }
    let invited = register(&app, "invited").await;
    app.offers
        .offer_by_team(founder.id, invited.id, Position::Designer)
        .await
        .unwrap();

    let incoming = app
        .offers
        .list_team_offers(founder.id, None, OfferedBy::User, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(incoming.total, 3);

    let designers = app
        .offers
        .list_team_offers(
            founder.id,
            Some(Position::Designer),
            OfferedBy::User,
            PageRequest::first(),
        )
        .await
        .unwrap();
    assert_eq!(designers.total, 2);

    let outgoing = app
        .offers
        .list_team_offers(founder.id, None, OfferedBy::Leader, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(outgoing.total, 1);

    // Listing the team's offers is the leader's view
    let err = app
        .offers
        .list_team_offers(invited.id, None, OfferedBy::User, PageRequest::first())
        .await
        .unwrap_err();
    assert_eq!(err, TeamsError::CurrentTeamNotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acceptances_never_overfill_a_position() {
    let app = setup();
    let founder = register(&app, "founder").await;
    let first = register(&app, "first").await;
    let second = register(&app, "second").await;
    let (team, _) = app
        .teams
        .create_team(
            founder.id,
            team_command("alpha", Position::Backend, Capacities::new(1, 1, 0, 0)),
        )
        .await
        .unwrap();

    // Two pending requests for the single designer slot
    let offer_a = app
        .offers
        .offer_by_user(first.id, team.id, Position::Designer)
        .await
        .unwrap();
    let offer_b = app
        .offers
        .offer_by_user(second.id, team.id, Position::Designer)
        .await
        .unwrap();

    let svc_a = app.offers.clone();
    let svc_b = app.offers.clone();
    let leader = founder.id;
    let (res_a, res_b) = tokio::join!(
        tokio::spawn(async move { svc_a.team_decide(leader, offer_a.id, true).await }),
        tokio::spawn(async move { svc_b.team_decide(leader, offer_b.id, true).await }),
    );
    let outcomes = [res_a.unwrap(), res_b.unwrap()];

    let admitted = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(TeamsError::TeamPositionUnavailable))));

    let (after, members) = app.teams.current_team(founder.id).await.unwrap();
    assert_eq!(after.current.designer, 1);
    assert_eq!(members.len(), 2);
}

use movie_ranking_service::models::{ConsensusMethod, Movie, MovieId};
use movie_ranking_service::services::reorder::{DragState, ListKind, Slot};
use movie_ranking_service::services::store::{InMemoryStore, RankingStore};
use movie_ranking_service::{CommunalError, CommunalRankingService};
use serde_json::json;
use std::sync::Arc;

fn seeded_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_catalog(vec![
        Movie::new("A", "Alien", 1979),
        Movie::new("B", "Brazil", 1985),
        Movie::new("C", "Casablanca", 1942),
    ]))
}

fn ids(movies: &[Movie]) -> Vec<&str> {
    movies.iter().map(|m| m.id.as_str()).collect()
}

#[tokio::test]
async fn test_communal_ranking_from_two_users() {
    let store = seeded_store();
    let user1 = store.register_user("Ada");
    let user2 = store.register_user("Bob");
    let service = CommunalRankingService::from_store(store.clone());

    service.submit_ranking(&user1.id, &json!(["A", "B"])).await.unwrap();
    service.submit_ranking(&user2.id, &json!(["B"])).await.unwrap();

    let communal = service.communal_ranking().await.unwrap();

    let ranked: Vec<(&str, Option<f64>)> = communal
        .ranked_movies
        .iter()
        .map(|m| (m.id().as_str(), m.average_ranking))
        .collect();
    assert_eq!(ranked, vec![("A", Some(0.0)), ("B", Some(0.5))]);

    let unranked: Vec<&str> = communal.unranked_movies.iter().map(|m| m.id().as_str()).collect();
    assert_eq!(unranked, vec!["C"]);
    assert_eq!(communal.contributing_user_ids, vec![user1.id, user2.id]);

    let b = &communal.ranked_movies[1];
    assert_eq!(b.user_rankings.len(), 2);
    assert_eq!(b.user_rankings[0].rank_number, 2);
    assert_eq!(b.user_rankings[0].rank_out_of, 2);
    assert_eq!(b.user_rankings[1].rank_pct, 0.0);
}

#[tokio::test]
async fn test_communal_ranking_serializes_for_clients() {
    let store = seeded_store();
    let user = store.register_user("Ada");
    let service = CommunalRankingService::from_store(store);

    service.submit_ranking(&user.id, &json!(["C"])).await.unwrap();
    let communal = service.communal_ranking().await.unwrap();
    let value = serde_json::to_value(&communal).unwrap();

    assert_eq!(value["rankedMovies"][0]["id"], "C");
    assert_eq!(value["rankedMovies"][0]["averageRanking"], 0.0);
    assert_eq!(value["unrankedMovies"].as_array().unwrap().len(), 2);
    assert_eq!(value["userIds"][0], user.id.as_str());
}

#[tokio::test]
async fn test_new_user_sees_whole_catalog_unranked() {
    let store = seeded_store();
    let user = store.register_user("Ada");
    let service = CommunalRankingService::from_store(store);

    let view = service.user_ranking_view(&user.access_token).await.unwrap();

    assert!(view.ranked_movies.is_empty());
    assert_eq!(ids(&view.unranked_movies), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_editing_session_round_trip() {
    let store = seeded_store();
    let user = store.register_user("Ada");
    let service = CommunalRankingService::from_store(store.clone());

    let mut session = service.editing_session(&user.access_token).await.unwrap();
    assert!(session.ranked().is_empty());

    // Drag Casablanca into the empty ranked list, then Alien below it.
    let drag = DragState::begin(&session, Slot::new(ListKind::Unranked, 2)).unwrap();
    assert!(drag.drop_on_empty(&mut session));
    assert!(session.move_between_lists(ListKind::Unranked, ListKind::Ranked, 0, 1));
    assert_eq!(ids(session.ranked()), vec!["C", "A"]);

    // Hovering over itself changes nothing.
    let mut drag = DragState::begin(&session, Slot::new(ListKind::Ranked, 1)).unwrap();
    assert!(!drag.hover(&mut session, Slot::new(ListKind::Ranked, 1), true));
    assert!(drag.hover(&mut session, Slot::new(ListKind::Ranked, 0), true));
    assert_eq!(ids(session.ranked()), vec!["A", "C"]);

    service.submit_session(&user.id, &session).await.unwrap();

    let stored = store.get_ranking(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.movie_ids, vec![MovieId::new("A"), MovieId::new("C")]);

    let reopened = service.editing_session(&user.access_token).await.unwrap();
    assert_eq!(ids(reopened.ranked()), vec!["A", "C"]);
    assert_eq!(ids(reopened.unranked()), vec!["B"]);

    let communal = service.communal_ranking().await.unwrap();
    let ranked: Vec<&str> = communal.ranked_movies.iter().map(|m| m.id().as_str()).collect();
    assert_eq!(ranked, vec!["A", "C"]);
}

#[tokio::test]
async fn test_rejected_submission_keeps_previous_ranking() {
    let store = seeded_store();
    let user = store.register_user("Ada");
    let service = CommunalRankingService::from_store(store.clone());

    service
        .submit_ranking_for_token(&user.access_token, &json!(["B", "A"]))
        .await
        .unwrap();
    let err = service
        .submit_ranking_for_token(&user.access_token, &json!(["x", "y", 3]))
        .await
        .unwrap_err();
    assert!(matches!(err, CommunalError::ValidationFailure(_)));

    let stored = store.get_ranking(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.movie_ids, vec![MovieId::new("B"), MovieId::new("A")]);
}

#[tokio::test]
async fn test_removed_movie_is_ignored_everywhere() {
    let store = seeded_store();
    let user = store.register_user("Ada");
    let service = CommunalRankingService::from_store(store.clone());

    service
        .submit_ranking(&user.id, &json!(["A", "B", "C"]))
        .await
        .unwrap();
    assert!(store.remove_movie(&MovieId::new("B")).await);

    let communal = service.communal_ranking().await.unwrap();
    let ranked: Vec<(&str, Option<f64>)> = communal
        .ranked_movies
        .iter()
        .map(|m| (m.id().as_str(), m.average_ranking))
        .collect();
    // Positions still count against the full stored ranking.
    assert_eq!(ranked, vec![("A", Some(0.0)), ("C", Some(1.0))]);
    assert!(communal.unranked_movies.is_empty());

    let view = service.user_ranking_view_for(&user.id).await.unwrap();
    assert_eq!(ids(&view.ranked_movies), vec!["A", "C"]);
}

#[tokio::test]
async fn test_skill_rating_consensus() {
    let store = seeded_store();
    let service =
        CommunalRankingService::from_store(store.clone()).with_method(ConsensusMethod::SkillRating);

    for order in [["C", "A", "B"], ["C", "B", "A"], ["C", "A", "B"]] {
        let user = store.register_user("voter");
        service.submit_ranking(&user.id, &json!(order)).await.unwrap();
    }

    let communal = service.communal_ranking().await.unwrap();
    let ranked: Vec<&str> = communal.ranked_movies.iter().map(|m| m.id().as_str()).collect();
    assert_eq!(ranked[0], "C");
    assert_eq!(ranked.len(), 3);

    let mus: Vec<f64> = communal
        .ranked_movies
        .iter()
        .map(|m| m.trueskill_mu.unwrap())
        .collect();
    assert!(mus.windows(2).all(|w| w[0] >= w[1]));
    assert!(communal.ranked_movies.iter().all(|m| m.average_ranking.is_some()));
}

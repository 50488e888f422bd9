mod common;

use common::{spawn_form_server, Harness, ACCEPTED_PAGE, REJECTED_PAGE, USER};
use form_quiz_bridge::error::SubmissionError;
use form_quiz_bridge::models::{AnswerPayload, MessageId, NavPhase, OptionIndex};
use form_quiz_bridge::services::{AnswerStore, NavigationStore, TestCatalog};
use std::sync::atomic::Ordering;
use form_quiz_bridge::{FlowOutcome, QuizEvent};

fn idx(i: u32) -> OptionIndex {
    OptionIndex::new(i).unwrap()
}

fn text(message_id: i32, text: &str) -> QuizEvent {
    QuizEvent::Message {
        message_id: MessageId(message_id),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_full_traversal_submits_literal_option_text() {
    let server = spawn_form_server(200, ACCEPTED_PAGE).await;
    let h = Harness::new(&server.base_url);
    let test = h.import_sample();
    let (q1, q2, q3) = (test.questions[0].id, test.questions[1].id, test.questions[2].id);

    assert!(matches!(h.send(QuizEvent::StartTest(test.id)).await, FlowOutcome::TestSelected(id) if id == test.id));
    assert!(matches!(h.send(QuizEvent::Advance).await, FlowOutcome::QuestionShown(id) if id == q1));
    assert!(h.chat.last_render().0.expects_freeform);

    // 文本题记录后自动进入下一题
    assert!(matches!(h.send(text(100, "Анна")).await, FlowOutcome::QuestionShown(id) if id == q2));
    let (render, _) = h.chat.last_render();
    assert!(render.text.starts_with("(2/3) Pick"));
    assert_eq!(render.media.as_deref(), Some("https://example.com/pick.png"));

    let outcome = h
        .send(QuizEvent::Select { question_id: q2, option: idx(2) })
        .await;
    assert!(matches!(outcome, FlowOutcome::QuestionShown(id) if id == q3));
    assert_eq!(
        h.answers.get(q2, USER).unwrap().unwrap().payload.to_strings(),
        vec!["2"]
    );

    // 多选题停留在当前题
    for option in [1, 3] {
        let outcome = h
            .send(QuizEvent::Select { question_id: q3, option: idx(option) })
            .await;
        assert!(matches!(outcome, FlowOutcome::QuestionShown(id) if id == q3));
    }
    assert_eq!(h.chat.last_render().0.selected_indices(), vec![idx(1), idx(3)]);

    assert!(matches!(h.send(QuizEvent::EndTest).await, FlowOutcome::Submitted(id) if id == test.id));

    let requests = server.request_lines();
    assert_eq!(requests.len(), 1);
    let line = &requests[0];
    assert!(line.starts_with("GET /forms/d/e/FORM/formResponse?&submit=Submit?"));
    assert!(line.contains("&entry.1a2b=%D0%90%D0%BD%D0%BD%D0%B0"));
    assert!(line.contains("&entry.3c4d=B"));
    assert!(line.contains("&entry.5e6f=Red&entry.5e6f=Blue"));

    assert_eq!(h.phase(), NavPhase::Idle);
    assert!(h.answers.answers_for(USER, &test.question_ids()).unwrap().is_empty());
    assert!(h.chat.last_notice().contains("已提交"));
}

#[tokio::test]
async fn test_last_single_choice_answer_triggers_submission() {
    let server = spawn_form_server(200, ACCEPTED_PAGE).await;
    let h = Harness::new(&server.base_url);
    let test = h.import_sample();
    let (q2, q3) = (test.questions[1].id, test.questions[2].id);

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::OpenQuestion(q2)).await;
    h.send(QuizEvent::Select { question_id: q2, option: idx(1) }).await;
    // 多选题什么都不选就下一题：没有下一题，直接提交
    let outcome = h.send(QuizEvent::Advance).await;
    assert!(matches!(outcome, FlowOutcome::Submitted(_)));

    let line = &server.request_lines()[0];
    assert!(line.contains("entry.3c4d=A"));
    assert!(!line.contains("entry.5e6f"));
    assert!(!line.contains("entry.1a2b"));
    assert!(h.answers.get(q3, USER).unwrap().is_none());
}

#[tokio::test]
async fn test_text_message_on_choice_question_is_deleted_not_stored() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let q2 = test.questions[1].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::OpenQuestion(q2)).await;

    let outcome = h.send(text(500, "B")).await;
    assert!(matches!(outcome, FlowOutcome::Discarded));
    assert!(h.chat.deleted().contains(&MessageId(500)));
    assert!(h.answers.get(q2, USER).unwrap().is_none());
    assert!(matches!(h.phase(), NavPhase::QuestionShown { question_id, .. } if question_id == q2));
}

#[tokio::test]
async fn test_empty_free_text_is_rejected_with_notice() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let q1 = test.questions[0].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;

    assert!(matches!(h.send(text(7, "   ")).await, FlowOutcome::Discarded));
    assert!(h.chat.last_notice().contains("不能为空"));
    assert!(h.answers.get(q1, USER).unwrap().is_none());

    // 提示和用户消息会在下一题展示前被清理
    let state_ids = h.navigation.load(USER).unwrap().ephemeral_message_ids;
    assert!(state_ids.contains(&MessageId(7)));

    h.send(text(8, "Анна")).await;
    let deleted = h.chat.deleted();
    for id in state_ids {
        assert!(deleted.contains(&id));
    }
}

#[tokio::test]
async fn test_prompt_artifacts_are_cleaned_before_next_prompt() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let q2 = test.questions[1].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::OpenQuestion(q2)).await;
    let (_, pick_ids) = h.chat.last_render();
    assert_eq!(pick_ids.len(), 2, "插图和题目各一条消息");

    h.send(QuizEvent::Select { question_id: q2, option: idx(1) }).await;
    let deleted = h.chat.deleted();
    for id in pick_ids {
        assert!(deleted.contains(&id));
    }
}

#[tokio::test]
async fn test_revisiting_multi_choice_keeps_prior_marks() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let q3 = test.questions[2].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::OpenQuestion(q3)).await;
    h.send(QuizEvent::Select { question_id: q3, option: idx(1) }).await;
    h.send(QuizEvent::Select { question_id: q3, option: idx(3) }).await;

    assert!(matches!(h.send(QuizEvent::BackToQuestions).await, FlowOutcome::TestSelected(_)));
    h.send(QuizEvent::OpenQuestion(q3)).await;
    assert_eq!(h.chat.last_render().0.selected_indices(), vec![idx(1), idx(3)]);

    h.send(QuizEvent::Select { question_id: q3, option: idx(2) }).await;
    let answer = h.answers.get(q3, USER).unwrap().unwrap();
    assert_eq!(answer.payload, AnswerPayload::selected([idx(1), idx(2), idx(3)]));
    assert_eq!(answer.revision, 2);
    assert_eq!(h.answers.answers_for(USER, &[q3]).unwrap().len(), 1);
}

#[tokio::test]
async fn test_selection_for_other_question_is_ignored() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let (q2, q3) = (test.questions[1].id, test.questions[2].id);

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::OpenQuestion(q2)).await;

    let outcome = h.send(QuizEvent::Select { question_id: q3, option: idx(1) }).await;
    assert!(matches!(outcome, FlowOutcome::Ignored));
    let outcome = h.send(QuizEvent::Select { question_id: q2, option: idx(9) }).await;
    assert!(matches!(outcome, FlowOutcome::Ignored));
    assert!(h.answers.get(q2, USER).unwrap().is_none());
}

#[tokio::test]
async fn test_deleted_test_forces_user_back_to_idle() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    h.catalog.remove(test.id).unwrap();

    assert!(matches!(h.send(QuizEvent::Advance).await, FlowOutcome::Vanished));
    assert_eq!(h.phase(), NavPhase::Idle);
    assert!(h.chat.last_notice().contains("不存在"));

    assert!(matches!(h.send(QuizEvent::StartTest(test.id)).await, FlowOutcome::Vanished));
}

#[tokio::test]
async fn test_question_outside_active_test_forces_user_back_to_idle() {
    let h = Harness::new("http://127.0.0.1:9");
    let active = h.import_sample();
    let other = h.import_sample();

    h.send(QuizEvent::StartTest(active.id)).await;
    h.send(QuizEvent::Advance).await;

    let foreign = other.questions[0].id;
    assert!(active.question(foreign).is_none());
    assert!(matches!(
        h.send(QuizEvent::OpenQuestion(foreign)).await,
        FlowOutcome::Vanished
    ));
    assert_eq!(h.phase(), NavPhase::Idle);
    assert!(h.chat.last_notice().contains("不存在"));
}

#[tokio::test]
async fn test_failed_deletes_do_not_stop_the_flow() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let (q1, q2) = (test.questions[0].id, test.questions[1].id);
    h.chat.fail_deletes.store(true, Ordering::SeqCst);

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    assert!(matches!(h.send(text(10, "Анна")).await, FlowOutcome::QuestionShown(id) if id == q2));

    assert!(h.chat.deleted().is_empty());
    assert_eq!(
        h.phase(),
        NavPhase::QuestionShown {
            test_id: test.id,
            question_id: q2
        }
    );
    let (_, shown) = h.chat.last_render();
    let state = h.navigation.load(USER).unwrap();
    assert_eq!(state.ephemeral_message_ids.len(), shown.len());
    assert!(h.answers.get(q1, USER).unwrap().is_some());
}

#[tokio::test]
async fn test_rejected_submission_keeps_answers_for_retry() {
    let server = spawn_form_server(200, REJECTED_PAGE).await;
    let h = Harness::new(&server.base_url);
    let test = h.import_sample();
    let q1 = test.questions[0].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    h.send(text(10, "Анна")).await;

    let outcome = h.send(QuizEvent::EndTest).await;
    let err = match outcome {
        FlowOutcome::SubmissionFailed(err) => err,
        other => panic!("expected SubmissionFailed, got {:?}", other),
    };
    assert!(matches!(err, SubmissionError::TestCompleteFail));
    assert_eq!(h.chat.last_notice(), err.user_message());

    assert_eq!(h.phase(), NavPhase::TestSelected { test_id: test.id });
    assert!(h.answers.get(q1, USER).unwrap().is_some());

    let log = std::fs::read_to_string(&h.failure_log).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(&format!("用户 {} | 测试 {}", USER, test.id)));
}

#[tokio::test]
async fn test_unreachable_provider_is_bad_request() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    h.send(text(10, "Анна")).await;

    let outcome = h.send(QuizEvent::EndTest).await;
    assert!(matches!(
        outcome,
        FlowOutcome::SubmissionFailed(SubmissionError::BadRequest { .. })
    ));
}

#[tokio::test]
async fn test_end_test_without_answers_fails_before_network() {
    let server = spawn_form_server(200, ACCEPTED_PAGE).await;
    let h = Harness::new(&server.base_url);
    let test = h.import_sample();

    h.send(QuizEvent::StartTest(test.id)).await;
    let outcome = h.send(QuizEvent::EndTest).await;
    assert!(matches!(
        outcome,
        FlowOutcome::SubmissionFailed(SubmissionError::UrlFailedCreation { .. })
    ));
    assert!(server.request_lines().is_empty());
}

#[tokio::test]
async fn test_end_test_is_idempotent() {
    let server = spawn_form_server(200, ACCEPTED_PAGE).await;
    let h = Harness::new(&server.base_url);
    let test = h.import_sample();

    assert!(matches!(h.send(QuizEvent::EndTest).await, FlowOutcome::Ignored));

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    h.send(text(10, "Анна")).await;
    assert!(matches!(h.send(QuizEvent::EndTest).await, FlowOutcome::Submitted(_)));
    assert!(matches!(h.send(QuizEvent::EndTest).await, FlowOutcome::Ignored));
    assert_eq!(server.request_lines().len(), 1);
}

#[tokio::test]
async fn test_return_to_menu_from_any_phase() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();

    assert!(matches!(h.send(QuizEvent::ReturnToMenu).await, FlowOutcome::ReturnedToMenu));

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    let (_, prompt_ids) = h.chat.last_render();

    assert!(matches!(h.send(QuizEvent::ReturnToMenu).await, FlowOutcome::ReturnedToMenu));
    assert_eq!(h.phase(), NavPhase::Idle);
    let deleted = h.chat.deleted();
    for id in prompt_ids {
        assert!(deleted.contains(&id));
    }

    assert!(matches!(h.send(QuizEvent::Advance).await, FlowOutcome::Ignored));
    assert!(matches!(h.send(text(3, "hello")).await, FlowOutcome::Ignored));
}

#[tokio::test]
async fn test_start_test_resumes_at_first_unanswered_question() {
    let h = Harness::new("http://127.0.0.1:9");
    let test = h.import_sample();
    let q2 = test.questions[1].id;

    h.send(QuizEvent::StartTest(test.id)).await;
    h.send(QuizEvent::Advance).await;
    h.send(text(10, "Анна")).await;
    h.send(QuizEvent::ReturnToMenu).await;

    h.send(QuizEvent::StartTest(test.id)).await;
    assert!(h.chat.last_notice().contains("已作答 1 道"));
    assert!(matches!(h.send(QuizEvent::Advance).await, FlowOutcome::QuestionShown(id) if id == q2));
}

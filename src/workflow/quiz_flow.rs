//! 测验流程 - 流程层
//!
//! 核心职责：处理一个用户的一个事件
//!
//! 流程顺序：
//! 1. 读取导航状态
//! 2. 按当前阶段处理事件（展示题目 / 记录答案 / 提交）
//! 3. 清理旧的临时消息后再展示新内容
//! 4. 通过 `navigation::transition` 写回新状态
//!
//! 测试或题目被删除时，提示用户并回到 Idle。

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{EncodedAnswers, FormResponseClient};
use crate::error::{AppError, AppResult, NavigationError, SubmissionError};
use crate::infrastructure::ChatPort;
use crate::models::answer::Answer;
use crate::models::descriptor::QuestionKind;
use crate::models::ids::{MessageId, OptionIndex, QuestionId, TestId, UserId};
use crate::models::navigation::{NavPhase, NavigationState};
use crate::models::quiz_test::{QuizTest, StoredQuestion};
use crate::services::question_kinds::{AnswerUpdate, UserInput};
use crate::services::{AnswerStore, FailureLog, NavigationStore, TestCatalog};
use crate::workflow::navigation::{transition, NavStep};
use crate::workflow::user_ctx::UserCtx;

/// 用户事件（由聊天传输层产生）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    /// 选择测试
    StartTest(TestId),
    /// 下一题（已选择测试时为第一道未作答的题）
    Advance,
    /// 打开当前测试中的某道题
    OpenQuestion(QuestionId),
    /// 点击选项
    Select {
        question_id: QuestionId,
        option: OptionIndex,
    },
    /// 用户发送的文本消息
    Message { message_id: MessageId, text: String },
    /// 回到题目列表
    BackToQuestions,
    /// 回到菜单
    ReturnToMenu,
    /// 结束测试并提交
    EndTest,
}

/// 事件处理结果
#[derive(Debug)]
pub enum FlowOutcome {
    TestSelected(TestId),
    QuestionShown(QuestionId),
    Submitted(TestId),
    /// 提交失败，用户回到测试，可以修改后重新提交
    SubmissionFailed(SubmissionError),
    /// 输入被丢弃（非文本题收到文本、空答案）
    Discarded,
    /// 当前状态不处理该事件
    Ignored,
    /// 测试或题目已被删除，已回到菜单
    Vanished,
    ReturnedToMenu,
}

/// 测验流程
///
/// - 编排导航、答案存储、提交
/// - 不持有聊天连接，只依赖 `ChatPort`
/// - 同一用户的事件必须串行调用（由 `orchestrator::Dispatcher` 保证）
pub struct QuizFlow {
    catalog: Arc<dyn TestCatalog>,
    answers: Arc<dyn AnswerStore>,
    navigation: Arc<dyn NavigationStore>,
    chat: Arc<dyn ChatPort>,
    submitter: FormResponseClient,
    failure_log: FailureLog,
}

impl QuizFlow {
    pub fn new(
        catalog: Arc<dyn TestCatalog>,
        answers: Arc<dyn AnswerStore>,
        navigation: Arc<dyn NavigationStore>,
        chat: Arc<dyn ChatPort>,
        submitter: FormResponseClient,
        failure_log: FailureLog,
    ) -> Self {
        Self {
            catalog,
            answers,
            navigation,
            chat,
            submitter,
            failure_log,
        }
    }

    /// 处理一个事件
    pub async fn handle(&self, user_id: UserId, event: QuizEvent) -> AppResult<FlowOutcome> {
        let state = self.navigation.load(user_id)?;
        let ctx = UserCtx::from_state(&state);
        debug!("{} 收到事件 {:?} (阶段 {})", ctx, event, state.phase.name());

        match self.dispatch(state, event).await {
            Err(AppError::Navigation(err)) if err.is_vanished() => {
                warn!("{} ⚠️ {}", ctx, err);
                self.recover(user_id).await
            }
            Err(AppError::Navigation(err)) => {
                debug!("{} 忽略事件: {}", ctx, err);
                Ok(FlowOutcome::Ignored)
            }
            other => other,
        }
    }

    async fn dispatch(&self, state: NavigationState, event: QuizEvent) -> AppResult<FlowOutcome> {
        match event {
            QuizEvent::StartTest(test_id) => {
                let test = self.load_test(test_id)?;
                self.select_test(&state, &test).await
            }
            QuizEvent::Advance => self.advance(&state).await,
            QuizEvent::OpenQuestion(question_id) => self.open_question(&state, question_id).await,
            QuizEvent::Select {
                question_id,
                option,
            } => self.select(&state, question_id, option).await,
            QuizEvent::Message { message_id, text } => self.message(&state, message_id, text).await,
            QuizEvent::BackToQuestions => match state.phase {
                NavPhase::TestSelected { test_id } | NavPhase::QuestionShown { test_id, .. } => {
                    let test = self.load_test(test_id)?;
                    self.select_test(&state, &test).await
                }
                NavPhase::Idle | NavPhase::Completed { .. } => Ok(FlowOutcome::Ignored),
            },
            QuizEvent::ReturnToMenu => {
                self.cleanup(&state).await;
                self.commit(&state, NavStep::Reset)?;
                info!("{} 🏠 返回菜单", UserCtx::from_state(&state));
                Ok(FlowOutcome::ReturnedToMenu)
            }
            QuizEvent::EndTest => match state.phase {
                NavPhase::TestSelected { test_id } | NavPhase::QuestionShown { test_id, .. } => {
                    let test = self.load_test(test_id)?;
                    self.finish(&state, &test).await
                }
                NavPhase::Idle | NavPhase::Completed { .. } => {
                    debug!("{} 没有进行中的测试，忽略结束请求", UserCtx::from_state(&state));
                    Ok(FlowOutcome::Ignored)
                }
            },
        }
    }

    // ========== 事件处理 ==========

    async fn select_test(&self, state: &NavigationState, test: &QuizTest) -> AppResult<FlowOutcome> {
        self.cleanup(state).await;

        let answered = self.answered_ids(state.user_id, test)?;
        let intro = format!(
            "📋 {}\n共 {} 道题，已作答 {} 道",
            test.title,
            test.questions.len(),
            answered.len()
        );
        let message_id = self.chat.notify(state.user_id, &intro).await?;

        self.commit(
            state,
            NavStep::SelectTest {
                test_id: test.id,
                ephemeral: vec![message_id],
            },
        )?;
        info!(
            "{} 📋 选择测试「{}」",
            UserCtx::new(state.user_id, Some(test.id)),
            test.title
        );
        Ok(FlowOutcome::TestSelected(test.id))
    }

    async fn advance(&self, state: &NavigationState) -> AppResult<FlowOutcome> {
        match state.phase {
            NavPhase::TestSelected { test_id } => {
                let test = self.load_test(test_id)?;
                let answered = self.answered_ids(state.user_id, &test)?;
                let target = test
                    .questions
                    .iter()
                    .find(|q| !answered.contains(&q.id))
                    .or_else(|| test.first_question());
                match target {
                    Some(question) => self.show_question(state, &test, question).await,
                    None => self.finish(state, &test).await,
                }
            }
            NavPhase::QuestionShown {
                test_id,
                question_id,
            } => {
                let test = self.load_test(test_id)?;
                load_question(&test, question_id)?;
                self.advance_from(state, &test, question_id).await
            }
            NavPhase::Idle | NavPhase::Completed { .. } => Ok(FlowOutcome::Ignored),
        }
    }

    async fn open_question(
        &self,
        state: &NavigationState,
        question_id: QuestionId,
    ) -> AppResult<FlowOutcome> {
        match state.phase {
            NavPhase::TestSelected { test_id } | NavPhase::QuestionShown { test_id, .. } => {
                let test = self.load_test(test_id)?;
                let question = load_question(&test, question_id)?;
                self.show_question(state, &test, question).await
            }
            NavPhase::Idle | NavPhase::Completed { .. } => Ok(FlowOutcome::Ignored),
        }
    }

    async fn select(
        &self,
        state: &NavigationState,
        question_id: QuestionId,
        option: OptionIndex,
    ) -> AppResult<FlowOutcome> {
        let test_id = match state.phase {
            NavPhase::QuestionShown {
                test_id,
                question_id: current,
            } if current == question_id => test_id,
            _ => return Ok(FlowOutcome::Ignored),
        };

        let test = self.load_test(test_id)?;
        let question = load_question(&test, question_id)?;
        let kind = question.descriptor.kind;

        let Some(update) = kind.capture_answer(&UserInput::Selection(option), &question.descriptor) else {
            debug!(
                "{} 题目 {} 不接受选项 {}",
                UserCtx::from_state(state),
                question_id,
                option
            );
            return Ok(FlowOutcome::Ignored);
        };
        self.store_answer(state, question, &update)?;

        if kind == QuestionKind::MultiChoice {
            self.show_question(state, &test, question).await
        } else {
            self.advance_from(state, &test, question_id).await
        }
    }

    async fn message(
        &self,
        state: &NavigationState,
        message_id: MessageId,
        text: String,
    ) -> AppResult<FlowOutcome> {
        let (test_id, question_id) = match state.phase {
            NavPhase::QuestionShown {
                test_id,
                question_id,
            } => (test_id, question_id),
            _ => return Ok(FlowOutcome::Ignored),
        };

        let test = self.load_test(test_id)?;
        let question = load_question(&test, question_id)?;
        let kind = question.descriptor.kind;

        if !kind.requires_freeform_input() {
            debug!("{} 选择题不接受文本，删除消息 {}", UserCtx::from_state(state), message_id);
            self.delete_quietly(state.user_id, message_id).await;
            return Ok(FlowOutcome::Discarded);
        }

        let Some(update) = kind.capture_answer(&UserInput::Text(text), &question.descriptor) else {
            let notice = self
                .chat
                .notify(state.user_id, "⚠️ 答案不能为空，请重新输入")
                .await?;
            self.commit(state, NavStep::Track(vec![message_id, notice]))?;
            return Ok(FlowOutcome::Discarded);
        };

        self.store_answer(state, question, &update)?;
        let state = self.commit(state, NavStep::Track(vec![message_id]))?;
        self.advance_from(&state, &test, question_id).await
    }

    // ========== 公共步骤 ==========

    async fn advance_from(
        &self,
        state: &NavigationState,
        test: &QuizTest,
        question_id: QuestionId,
    ) -> AppResult<FlowOutcome> {
        match test.next_after(question_id) {
            Some(next) => self.show_question(state, test, next).await,
            None => self.finish(state, test).await,
        }
    }

    async fn show_question(
        &self,
        state: &NavigationState,
        test: &QuizTest,
        question: &StoredQuestion,
    ) -> AppResult<FlowOutcome> {
        self.cleanup(state).await;

        let descriptor = &question.descriptor;
        let prior = self.answers.get(question.id, state.user_id)?;
        let mut request = descriptor
            .kind
            .render_prompt(descriptor, prior.as_ref().map(|a| &a.payload));
        request.text = format!("({}/{}) {}", descriptor.order, test.questions.len(), request.text);

        let ephemeral = self.chat.render(state.user_id, &request).await?;
        self.commit(
            state,
            NavStep::ShowQuestion {
                question_id: question.id,
                ephemeral,
            },
        )?;

        debug!(
            "{} 展示题目 №{} ({})",
            UserCtx::new(state.user_id, Some(test.id)),
            descriptor.order,
            descriptor.kind
        );
        Ok(FlowOutcome::QuestionShown(question.id))
    }

    /// 结束作答并提交
    ///
    /// 成功后删除答案并回到 Idle；失败时保留答案，回到 TestSelected
    async fn finish(&self, state: &NavigationState, test: &QuizTest) -> AppResult<FlowOutcome> {
        let ctx = UserCtx::new(state.user_id, Some(test.id));
        self.cleanup(state).await;
        let state = self.commit(state, NavStep::Complete)?;

        let answers = self.answers.answers_for(state.user_id, &test.question_ids())?;
        info!("{} 📤 正在提交 {} 道题的答案...", ctx, answers.len());

        let result = match encode_answers(test, &answers) {
            Ok(encoded) => {
                self.submitter
                    .submit_metadata(&test.form_metadata, &encoded)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                let removed = self.answers.remove_for(state.user_id, &test.question_ids())?;
                self.commit(&state, NavStep::Reset)?;
                info!("{} ✅ 提交成功，清除 {} 条答案", ctx, removed);
                self.chat
                    .notify(
                        state.user_id,
                        &format!("✅ 「{}」的答案已提交，感谢参与！", test.title),
                    )
                    .await?;
                Ok(FlowOutcome::Submitted(test.id))
            }
            Err(err) => {
                warn!("{} ❌ 提交失败: {}", ctx, err);
                if let Err(e) = self
                    .failure_log
                    .record(state.user_id, test.id, &err.to_string())
                    .await
                {
                    error!("{} 写入失败记录出错: {:#}", ctx, e);
                }

                self.commit(
                    &state,
                    NavStep::SelectTest {
                        test_id: test.id,
                        ephemeral: Vec::new(),
                    },
                )?;
                self.chat.notify(state.user_id, err.user_message()).await?;
                Ok(FlowOutcome::SubmissionFailed(err))
            }
        }
    }

    /// 测试或题目被删除后回到 Idle
    async fn recover(&self, user_id: UserId) -> AppResult<FlowOutcome> {
        let state = self.navigation.load(user_id)?;
        self.cleanup(&state).await;
        self.commit(&state, NavStep::Reset)?;
        self.chat
            .notify(user_id, "⚠️ 该测试或题目已不存在，已返回菜单")
            .await?;
        Ok(FlowOutcome::Vanished)
    }

    // ========== 辅助函数 ==========

    fn commit(&self, state: &NavigationState, step: NavStep) -> AppResult<NavigationState> {
        let next = transition(state, step)?;
        self.navigation.save(&next, state.version)?;
        Ok(next)
    }

    /// 删除当前记录的临时消息
    ///
    /// 删除失败只记录日志；随后的状态转换会替换临时消息集合
    async fn cleanup(&self, state: &NavigationState) {
        for message_id in &state.ephemeral_message_ids {
            self.delete_quietly(state.user_id, *message_id).await;
        }
    }

    async fn delete_quietly(&self, user_id: UserId, message_id: MessageId) {
        if let Err(e) = self.chat.delete(user_id, message_id).await {
            warn!("[用户 #{}] 删除消息失败: {}", user_id, e);
        }
    }

    fn store_answer(
        &self,
        state: &NavigationState,
        question: &StoredQuestion,
        update: &AnswerUpdate,
    ) -> AppResult<Answer> {
        let answer = self
            .answers
            .upsert(question.id, state.user_id, &|prior| update.apply(prior))?;
        info!(
            "{} ✓ 题目 №{} 已保存 (版本 {})",
            UserCtx::from_state(state),
            question.descriptor.order,
            answer.revision
        );
        Ok(answer)
    }

    fn load_test(&self, test_id: TestId) -> AppResult<Arc<QuizTest>> {
        self.catalog
            .get(test_id)?
            .ok_or_else(|| NavigationError::TestVanished(test_id).into())
    }

    fn answered_ids(&self, user_id: UserId, test: &QuizTest) -> AppResult<HashSet<QuestionId>> {
        Ok(self
            .answers
            .answers_for(user_id, &test.question_ids())?
            .into_iter()
            .filter(|a| !a.payload.is_empty())
            .map(|a| a.question_id)
            .collect())
    }
}

fn load_question(test: &QuizTest, question_id: QuestionId) -> AppResult<&StoredQuestion> {
    test.question(question_id).ok_or_else(|| {
        NavigationError::QuestionVanished {
            test_id: test.id,
            question_id,
        }
        .into()
    })
}

/// 把已保存的答案编码为提交参数，未作答的题目不提交
fn encode_answers(test: &QuizTest, answers: &[Answer]) -> Result<EncodedAnswers, SubmissionError> {
    let mut encoded = EncodedAnswers::new();
    for answer in answers.iter().filter(|a| !a.payload.is_empty()) {
        let Some(question) = test.question(answer.question_id) else {
            continue;
        };
        let descriptor = &question.descriptor;
        let pairs = descriptor.kind.encode_for_submission(&answer.payload, descriptor)?;
        encoded.insert(question.id, pairs);
    }
    Ok(encoded)
}

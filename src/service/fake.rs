use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::service::{ChatContext, LanguageModel, ServiceError, SpeechToText};

/// Language model that replays canned replies in order and records calls.
#[derive(Default)]
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Result<String, ServiceError>>>,
    pub sends: RefCell<Vec<(ChatContext, String)>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        let model = Self::default();
        for reply in replies {
            model.push(reply);
        }
        model
    }

    pub fn push(&self, reply: &str) {
        self.replies.borrow_mut().push_back(Ok(reply.to_string()));
    }

    pub fn push_err(&self, err: ServiceError) {
        self.replies.borrow_mut().push_back(Err(err));
    }

    pub fn send_count(&self) -> usize {
        self.sends.borrow().len()
    }

    pub fn generate_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    fn next(&self) -> Result<String, ServiceError> {
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Response("script exhausted".to_string())))
    }
}

impl LanguageModel for ScriptedModel {
    fn send(&self, context: &ChatContext, message: &str) -> Result<String, ServiceError> {
        self.sends
            .borrow_mut()
            .push((context.clone(), message.to_string()));
        self.next()
    }

    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.next()
    }
}

/// Transcriber returning canned texts in order.
#[derive(Default)]
pub struct ScriptedSpeech {
    texts: RefCell<VecDeque<Result<String, ServiceError>>>,
    pub calls: Cell<usize>,
}

impl ScriptedSpeech {
    pub fn new(texts: &[&str]) -> Self {
        let speech = Self::default();
        for text in texts {
            speech.texts.borrow_mut().push_back(Ok(text.to_string()));
        }
        speech
    }

    pub fn push_err(&self, err: ServiceError) {
        self.texts.borrow_mut().push_back(Err(err));
    }
}

impl SpeechToText for ScriptedSpeech {
    fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ServiceError> {
        self.calls.set(self.calls.get() + 1);
        self.texts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

//! Topic, script and production-plan generation on top of the chat client.

use tracing::info;

use crate::{
    error::{PipelineError, Result},
    llm::{ChatClient, CompletionRequest},
    segmenter::{NARRATION_LABEL, PROMPT_LABEL},
};

const TOPIC_SYSTEM: &str = "You are a viral trend analyst for YouTube content.";
const SCRIPT_SYSTEM: &str = "You are a viral short-form scriptwriter for YouTube.";
const PLAN_SYSTEM: &str = "You are a video producer who turns scripts into shot lists.";
const THUMBNAIL_SYSTEM: &str = "You are a YouTube thumbnail designer for viral Shorts.";

pub struct ScriptWriter {
    client: ChatClient,
}

impl ScriptWriter {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Ask for one trending short-video topic, as a title and a one-sentence description.
    pub async fn suggest_topic(&self) -> Result<String> {
        let user = "Give me one viral YouTube Shorts topic related to personal finance, \
                    motivation, or entrepreneurship that is trending right now. \
                    Reply with a title on the first line and a 1-sentence description \
                    on the second line, nothing else."
            .to_string();

        let topic = self
            .ask(CompletionRequest {
                system: TOPIC_SYSTEM.to_string(),
                user,
                temperature: 0.8,
                max_tokens: 300,
            })
            .await?;
        info!("Topic: {}", topic);
        Ok(topic)
    }

    pub async fn write_script(&self, topic: &str) -> Result<String> {
        let user = format!(
            "Write a fast-paced, highly engaging 60-second script for a YouTube Short.\n\n\
             Topic: {topic}\n\n\
             Make it punchy, emotional, and structured for voiceover narration. \
             Use short sentences and hooks. End with a call to action."
        );

        self.ask(CompletionRequest {
            system: SCRIPT_SYSTEM.to_string(),
            user,
            temperature: 0.9,
            max_tokens: 500,
        })
        .await
    }

    /// Rewrite a script into the labelled shot list the segmenter reads.
    pub async fn plan_scenes(&self, script: &str) -> Result<String> {
        self.ask(CompletionRequest {
            system: PLAN_SYSTEM.to_string(),
            user: plan_prompt(script),
            temperature: 0.7,
            max_tokens: 700,
        })
        .await
    }

    /// Describe a thumbnail for the video: overlay text, visual elements and tone.
    pub async fn thumbnail_concept(&self, title: &str, description: &str) -> Result<String> {
        let concept = self
            .ask(CompletionRequest {
                system: THUMBNAIL_SYSTEM.to_string(),
                user: thumbnail_prompt(title, description),
                temperature: 0.7,
                max_tokens: 300,
            })
            .await?;
        info!("Thumbnail concept: {}", concept);
        Ok(concept)
    }

    async fn ask(&self, request: CompletionRequest) -> Result<String> {
        self.client
            .complete(&request)
            .await
            .map_err(PipelineError::ScriptGenerationFailed)
    }
}

fn plan_prompt(script: &str) -> String {
    format!(
        "Break this YouTube Shorts script into a shot-by-shot production plan.\n\
         For each shot, include:\n\
         - {n} (1 sentence max)\n\
         - Visual: (brief description)\n\
         - {p} (image generation prompt)\n\n\
         Format each shot like this:\n\
         Shot X:\n\
         {n} [text here]\n\
         Visual: [description here]\n\
         {p} [image prompt here]\n\n\
         SCRIPT:\n\
         {script}",
        n = NARRATION_LABEL,
        p = PROMPT_LABEL,
    )
}

fn thumbnail_prompt(title: &str, description: &str) -> String {
    format!(
        "Suggest an attention-grabbing thumbnail for this YouTube Short.\n\n\
         Title: \"{title}\"\n\
         Description: {description}\n\n\
         Describe:\n\
         - Text: the words shown on the thumbnail (3-5 words max)\n\
         - Elements: the visual elements to include (person, object, background)\n\
         - Tone: the emotion it should convey (curiosity, urgency, awe)"
    )
}

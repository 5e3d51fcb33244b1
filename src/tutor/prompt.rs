//! Prompt text sent to the language model. The output formats requested here
//! are the contract `markers` parses.

use crate::tutor::configuration::{Configuration, GiveUpPolicy, Variant};
use crate::tutor::markers::{FEEDBACK_MARKER, PRACTICE_MARKER, QUESTION_MARKER};
use crate::tutor::session::{LevelChoice, PracticeOrigin, Progress};

pub fn system_instruction(config: &Configuration, progress: &Progress) -> String {
    match config.variant {
        Variant::Roleplay => roleplay_instruction(config),
        Variant::Kids => kids_instruction(config, progress),
    }
}

fn roleplay_instruction(config: &Configuration) -> String {
    let mut text = format!(
        "あなたは日本人学習者の英会話の相手をする先生です。以下の設定でロールプレイを行います。\n\
         あなたの役割: {persona}\n\
         学習者のレベル: {level}\n\
         シチュエーション: {scenario}\n",
        persona = config.persona,
        level = config.level,
        scenario = config.scenario,
    );
    if let Some(reference) = &config.reference_text {
        text.push_str("\n以下の参考資料の内容に沿って会話を進めてください。\n[参考資料]\n");
        text.push_str(reference);
        text.push('\n');
    }
    text.push_str(&format!(
        "\n【厳守する出力フォーマット】\n\
         {FEEDBACK_MARKER}\n\
         - 学習者の直前の英語について、良い点と直すべき点を日本語で箇条書き（初回は省略）\n\
         {QUESTION_MARKER}\n\
         次にあなたが学習者に投げかける英語の質問を1つだけ（英語のみ）\n\n\
         学習者の英語に意味が通じないほどの誤りがある場合は、{QUESTION_MARKER} の代わりに\n\
         {PRACTICE_MARKER}\n\
         学習者が言いたかったことを正しく言い直した英文を1文だけ\n\
         を出力してください。マーカー以外の見出しや前置きは不要です。"
    ));
    text
}

fn kids_instruction(config: &Configuration, progress: &Progress) -> String {
    format!(
        "あなたは、6歳の日本の子供に英語を教える、超絶優しくて明るい英語の先生です。\n\
         以下のシチュエーションでロールプレイを行います。\n\
         シチュエーション: {scenario}\n\
         子供の名前: {name}\n\
         むずかしさ: レベル{level}（レベルが上がるほど、ほんの少しずつ長い文にしてください）\n\n\
         【厳守する出力フォーマット】\n\
         必ず以下のXMLタグを使って出力してください。他の言葉は一切不要です。\n\
         <praise>（子供が発言した場合、ひらがなで大げさに褒める言葉。初回は空でOK）</praise>\n\
         <ai_en>（あなたが子供に投げかける、超簡単な英語の質問。1文のみ）</ai_en>\n\
         <ai_ja>（上の英語のひらがな訳）</ai_ja>\n\
         <ai_ruby>（上の英語に「Word(カタカナ)」の形式でルビを振ったもの。例: What(ホワット) is(イズ) it?(イット)）</ai_ruby>\n\
         <hint_en>（子供がそのまま真似して答えるための、超簡単な英語の答え。1文のみ）</hint_en>\n\
         <hint_ja>（上の答えのひらがな訳）</hint_ja>\n\
         <hint_ruby>（上の答えのルビ付き。例: I(アイ) like(ライク) apples.(アップルズ)）</hint_ruby>",
        scenario = config.scenario,
        name = config.learner_name,
        level = progress.level,
    )
}

pub fn opening(variant: Variant) -> &'static str {
    match variant {
        Variant::Roleplay => "ロールプレイを始めてください。最初の質問をしてください。",
        Variant::Kids => "ゲームをはじめましょう。最初の質問をしてください。",
    }
}

/// How a learner's utterance is phrased on the wire.
pub fn frame_utterance(variant: Variant, said: &str) -> String {
    match variant {
        Variant::Roleplay => said.to_string(),
        Variant::Kids => format!(
            "子供は「{said}」と言いました。めちゃくちゃ褒めて、次の展開の質問を1つ出してください。"
        ),
    }
}

pub fn skip(variant: Variant) -> &'static str {
    match variant {
        Variant::Roleplay => {
            "この質問はむずかしいのでスキップします。話の流れは保ったまま、もう少し答えやすい別の質問をしてください。"
        }
        Variant::Kids => {
            "子供が難しがってパスしました。「だいじょうぶだよ！」と優しく励まして、さっきとは違う、もっと簡単な質問をしてください。"
        }
    }
}

pub fn give_up(policy: GiveUpPolicy) -> String {
    let after = match policy {
        GiveUpPolicy::ContinueNarrative => "練習が終わったら、今の話の続きから会話を再開します。",
        GiveUpPolicy::FreshQuestion => "練習が終わったら、新しい話題の質問に移ります。",
    };
    format!(
        "ギブアップします。直前の質問の意味と答え方を {FEEDBACK_MARKER} に日本語でやさしく解説し、\
         そのまま真似できる模範解答の英文を1文だけ {PRACTICE_MARKER} に書いてください。{after}"
    )
}

/// Sent when the learner confirms they are done with repeat practice.
pub fn resume(origin: PracticeOrigin, policy: GiveUpPolicy) -> String {
    let fresh = origin == PracticeOrigin::GiveUp && policy == GiveUpPolicy::FreshQuestion;
    if fresh {
        format!(
            "リピート練習が終わりました。新しい話題に切り替えて、{QUESTION_MARKER} に次の質問を1つしてください。"
        )
    } else {
        format!(
            "リピート練習が終わりました。全く新しい質問ではなく、これまでの会話の流れ（物語）を自然に続けて、\
             {QUESTION_MARKER} に次の質問を1つしてください。"
        )
    }
}

pub fn level_choice(choice: LevelChoice, level: u32) -> String {
    match choice {
        LevelChoice::Advance => format!(
            "ほしが5こたまって、レベル{level}にあがりました！さっきの答えをたくさん褒めて、\
             ほんの少しだけむずかしい次の質問を1つ出してください。"
        ),
        LevelChoice::Repeat => format!(
            "ほしが5こたまりました！同じレベル{level}のまま、さっきの答えをたくさん褒めて、\
             同じくらいのむずかしさで次の質問を1つ出してください。"
        ),
    }
}

pub fn transcription() -> &'static str {
    "英語を文字起こししてください。文字のみ出力。聞き取れない場合は何も出力しないでください。"
}

pub fn judge(model_sentence: &str, spoken: &str) -> String {
    format!(
        "お手本:「{model_sentence}」\n発音:「{spoken}」\n\
         一言一句同じか厳格に判定し、違いや抜け漏れがあれば日本語で1文で厳しく指摘してください。"
    )
}

pub fn translate(question: &str) -> String {
    format!("次の英文を自然な日本語に訳してください。訳文のみ出力してください。\n{question}")
}

pub fn suggest_answer(question: &str, level: &str) -> String {
    format!(
        "英会話の練習中です。次の質問への回答例を、学習者のレベル（{level}）に合った英語で1〜2文、\
         その下に日本語訳をつけて出力してください。\n質問: {question}"
    )
}

pub fn look_up(word: &str) -> String {
    format!(
        "英単語・英語表現「{word}」の意味を、日本語で簡潔に説明し、短い例文を1つ添えてください。"
    )
}

pub fn shadowing_script(level: &str, situation: &str) -> String {
    format!(
        "シャドーイング用の英語スクリプトを作成してください。レベル:{level}, 状況:{situation}。\
         出力は英語のセリフのみとし、数行程度にしてください。"
    )
}

pub fn split_script(script: &str) -> String {
    format!(
        "以下の英文を、意味のまとまり（または1文）ごとに分割し、それぞれに日本語訳をつけてください。\n\
         【出力フォーマット（厳守）】\n\
         英語 || 日本語訳\n\n\
         英文:\n{script}"
    )
}

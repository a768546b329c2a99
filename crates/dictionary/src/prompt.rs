use serde_json::{json, Value};

use crate::{Meaning, StudentLevel};

fn level_instructions(level: StudentLevel) -> &'static str {
    match level {
        StudentLevel::Elementary => {
            "초등학생이 읽는다고 생각하고 아주 쉬운 낱말과 짧은 문장으로 설명하세요. \
             친근한 말투(~해요)를 쓰고, 한자어는 뜻을 풀어서 알려 주세요. \
             예문은 학교와 가정 등 아이의 일상에서 고르세요. \
             어원(etymology)은 '단어의 비밀'처럼 재미있는 이야기로 짧게 들려 주세요."
        }
        StudentLevel::Middle => {
            "중학생 교과서 수준의 어휘로 정확하게 설명하세요. \
             개념을 분명히 하고, 한자어는 각 글자의 뜻을 함께 밝혀 주세요. \
             예문은 교과 학습이나 청소년의 생활에서 고르세요."
        }
        StudentLevel::High => {
            "고등학생과 수능을 준비하는 학생을 위해 교과서와 비문학 지문 수준의 어휘로 설명하세요. \
             한자어의 구성 원리와 문맥에 따른 쓰임 차이를 짚어 주세요. \
             예문은 논설문이나 신문 기사 같은 문어체로 쓰세요."
        }
        StudentLevel::Academic => {
            "전문가와 연구자를 위한 학술적 정의를 제시하세요. \
             국어학적 근거와 어원, 형태 분석(wordStructure)을 상세히 쓰고, \
             분야별 전문 용법이 있다면 구분해 주세요. 예문은 학술 문헌의 문체로 쓰세요."
        }
    }
}

/// Instruction sent with every definition request.
pub(crate) fn definition_prompt(word: &str, level: StudentLevel) -> String {
    format!(
        "당신은 한국어 어휘 교육 전문가입니다. 단어 \"{word}\"를 {label} 수준에 맞춰 사전처럼 풀이해 주세요.\n\
         {instructions}\n\
         \n\
         규칙:\n\
         - 소리가 같지만 뜻이 다른 동음이의어가 있다면 각각을 별도의 meaning으로 나누고, \
           한자어라면 hanja에 한자를 적고 고유어라면 hanja를 비워 두세요.\n\
         - 하나의 뜻에서 파생된 다의어라면 같은 hanja 값을 유지하세요.\n\
         - englishTranslation에는 해당 뜻의 영어 대역어를 적으세요.\n\
         - literacyImprovement에는 이 단어를 활용해 문해력을 키울 수 있는 짧은 글과 해설을 쓰세요.\n\
         - relatedWords에는 함께 배우면 좋은 단어 3~6개를 이모지와 함께 적으세요.\n\
         - tags에는 주제어를 2~4개 적으세요.\n\
         - 응답은 설명 없이 JSON 객체 하나만 반환하세요.",
        label = level.label(),
        instructions = level_instructions(level),
    )
}

/// Output shape requested from the text model.
pub(crate) fn definition_schema() -> Value {
    let string = json!({ "type": "STRING" });
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "word": string,
            "emoji": string,
            "pronunciation": string,
            "meanings": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "context": string,
                        "emoji": string,
                        "definition": string,
                        "englishTranslation": string,
                        "hanja": string,
                        "pronunciation": string,
                        "exampleSentence": string,
                        "synonyms": string_list,
                        "antonyms": string_list,
                        "etymology": string,
                        "wordStructure": string
                    },
                    "required": ["context", "definition", "englishTranslation", "exampleSentence", "synonyms", "antonyms"]
                }
            },
            "literacyImprovement": string,
            "idioms": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": { "expression": string, "meaning": string },
                    "required": ["expression", "meaning"]
                }
            },
            "relatedWords": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": { "word": string, "emoji": string },
                    "required": ["word", "emoji"]
                }
            },
            "tags": string_list
        },
        "required": ["word", "pronunciation", "meanings", "literacyImprovement", "relatedWords", "tags"]
    })
}

pub(crate) fn image_prompt(word: &str, meaning: &Meaning, level: StudentLevel) -> String {
    let style = match level {
        StudentLevel::Elementary => "bright, friendly picture-book illustration with soft colors",
        StudentLevel::Middle => "clean, colorful educational illustration",
        StudentLevel::High => "detailed textbook-style illustration",
        StudentLevel::Academic => "precise, realistic reference illustration",
    };
    format!(
        "Draw a {style} that explains the Korean word \"{word}\" in the sense of \"{context}\" \
         ({translation}): {definition}. Show a single clear scene. Do not include any text or letters.",
        context = meaning.context,
        translation = meaning.english_translation,
        definition = meaning.definition,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_prompt_carries_word_and_level_instructions() {
        let prompt = definition_prompt("사랑", StudentLevel::High);
        assert!(prompt.contains("\"사랑\""));
        assert!(prompt.contains("고등학생"));
        assert!(prompt.contains("수능"));

        let prompt = definition_prompt("배", StudentLevel::Elementary);
        assert!(prompt.contains("초등학생"));
        assert!(prompt.contains("단어의 비밀"));
    }

    #[test]
    fn each_level_has_its_own_instructions() {
        let prompts = StudentLevel::ALL
            .iter()
            .map(|level| level_instructions(*level))
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(prompts.len(), StudentLevel::ALL.len());
    }

    #[test]
    fn schema_lists_camel_case_fields() {
        let schema = definition_schema();
        let meaning = &schema["properties"]["meanings"]["items"]["properties"];
        assert!(meaning.get("englishTranslation").is_some());
        assert!(meaning.get("exampleSentence").is_some());
        assert!(schema["properties"].get("literacyImprovement").is_some());
    }

    #[test]
    fn image_prompt_describes_the_meaning() {
        let meaning = Meaning {
            context: "탈것".to_owned(),
            english_translation: "boat".to_owned(),
            definition: "물 위를 다니는 교통수단".to_owned(),
            ..Meaning::default()
        };
        let prompt = image_prompt("배", &meaning, StudentLevel::Elementary);
        assert!(prompt.contains("\"배\""));
        assert!(prompt.contains("boat"));
        assert!(prompt.contains("picture-book"));
    }
}

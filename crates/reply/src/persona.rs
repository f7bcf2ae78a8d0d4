//! Persona prompts
//!
//! One directive feeds both backends. The primary backend gets it as the
//! system message and sees the emotion only inside the user turn; the
//! secondary backend gets the emotion folded into its system instruction.

/// Voice-chatbot persona and tone rules
pub const PERSONA_DIRECTIVE: &str = "Bạn là chatbot giao tiếp bằng giọng nói. \
Luôn trả lời hoàn toàn bằng tiếng Việt, ngắn gọn, tự nhiên, thân thiện. \
Giọng điệu phải thích ứng với trạng thái người dùng dựa trên ngữ cảnh được cung cấp. \
Nếu người dùng buồn hoặc tiêu cực: ưu tiên an ủi, nhẹ nhàng. \
Nếu người dùng vui hoặc tích cực: phản hồi tích cực nhưng không phấn khích quá mức. \
Nếu trạng thái bình thường: phản hồi trung tính, rõ ràng, đi thẳng vào nội dung. \
KHÔNG nhắc tên cảm xúc. KHÔNG phán xét. KHÔNG đưa lời khuyên quá mức.";

/// System message for the primary backend
pub fn primary_system_prompt() -> &'static str {
    PERSONA_DIRECTIVE
}

/// User turn for the primary backend: hidden emotion context plus the utterance
pub fn primary_user_prompt(emotion: &str, user_text: &str) -> String {
    format!(
        "Ngữ cảnh cảm xúc (ẩn, không được nhắc): {}\nNgười dùng nói: \"{}\"",
        emotion, user_text
    )
}

/// System instruction for the secondary backend, with the emotion stated directly
pub fn secondary_instruction(emotion: &str) -> String {
    format!(
        "{} Người dùng đang cảm thấy: '{}'. Điều chỉnh giọng điệu phù hợp.",
        PERSONA_DIRECTIVE, emotion
    )
}
